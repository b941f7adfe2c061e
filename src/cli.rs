use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{
    self, CommandReport, harvest_details::HarvestDetailsOptions,
    harvest_listing::HarvestListingOptions, reconcile::ReconcileOptions, stats::StatsOptions,
};
use crate::photos::record::YearMonth;

/// Harvest photo metadata into a local page cache, report keyword usage
/// per month and match photos back to an on-disk archive.
#[derive(Parser)]
#[command(name = "phototags", version)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every listing page for an owner into the cache.
    HarvestListing {
        #[arg(long)]
        owner: String,
        /// First page to fetch; earlier pages are left untouched.
        #[arg(long, default_value_t = 1)]
        start_page: u32,
    },
    /// Fetch per-photo details for cached listing pages.
    HarvestDetails {
        #[arg(long)]
        owner: String,
        #[arg(long, default_value_t = 1)]
        start_page: u32,
        /// Last page to process. Defaults to the last cached listing page.
        #[arg(long)]
        end_page: Option<u32>,
    },
    /// Monthly record and keyword counts from cached tags pages.
    Stats {
        #[arg(long = "owner")]
        owners: Vec<String>,
        /// First month, YYYY-MM.
        #[arg(long)]
        start: Option<YearMonth>,
        /// Last month, YYYY-MM.
        #[arg(long)]
        end: Option<YearMonth>,
        /// Number of keywords listed in the frequency report.
        #[arg(long)]
        top: Option<usize>,
        /// Also write the monthly table as CSV to this path.
        #[arg(long)]
        csv_out: Option<PathBuf>,
    },
    /// Locate archive files for cached records or a single timestamp.
    Reconcile {
        #[arg(long = "owner")]
        owners: Vec<String>,
        /// Resolve one `YYYY-MM-DD HH:MM:SS` timestamp instead of the cache.
        #[arg(long)]
        timestamp: Option<String>,
        #[arg(long)]
        archive_root: Option<PathBuf>,
        /// Accept files within the configured tolerance window.
        #[arg(long)]
        tolerance: bool,
        /// Print one line per record.
        #[arg(long)]
        verbose: bool,
    },
    /// Show resolved paths, configuration and cache coverage.
    Status,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for line in &report.details {
            println!("{line}");
        }
        for issue in &report.issues {
            eprintln!("issue: {issue}");
        }
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match cli.command {
        Command::HarvestListing { owner, start_page } => {
            commands::harvest_listing::run(&HarvestListingOptions { owner, start_page })?
        }
        Command::HarvestDetails {
            owner,
            start_page,
            end_page,
        } => commands::harvest_details::run(&HarvestDetailsOptions {
            owner,
            start_page,
            end_page,
            progress_to_stderr: cli.json,
        })?,
        Command::Stats {
            owners,
            start,
            end,
            top,
            csv_out,
        } => commands::stats::run(&StatsOptions {
            owners,
            start,
            end,
            top,
            csv_out,
        })?,
        Command::Reconcile {
            owners,
            timestamp,
            archive_root,
            tolerance,
            verbose,
        } => commands::reconcile::run(&ReconcileOptions {
            owners,
            timestamp,
            archive_root,
            tolerance,
            verbose,
        })?,
        Command::Status => commands::status::run()?,
    };

    print_report(&report, cli.json)?;
    if report.ok {
        Ok(())
    } else {
        Err(anyhow!("{} failed", report.command))
    }
}
