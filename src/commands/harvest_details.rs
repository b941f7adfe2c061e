use anyhow::Result;
use std::io::{self, Write};

use crate::commands::{CommandReport, issue_or_err, load_context};
use crate::photos::cache::{PageCache, PageKind};
use crate::photos::credentials::lookup_api_key;
use crate::photos::harvester::{HarvestOptions, Harvester};
use crate::photos::transport::FlickrClient;

#[derive(Debug, Clone)]
pub struct HarvestDetailsOptions {
    pub owner: String,
    pub start_page: u32,
    pub end_page: Option<u32>,
    /// Send display lines to stderr so stdout carries only the report.
    pub progress_to_stderr: bool,
}

pub fn run(opts: &HarvestDetailsOptions) -> Result<CommandReport> {
    let (paths, cfg) = load_context()?;
    let mut report = CommandReport::new("harvest-details");

    let owner = opts.owner.trim();
    if owner.is_empty() {
        report.issue("owner cannot be empty");
        return Ok(report);
    }

    let api_key = match lookup_api_key(&paths.credentials_file, &cfg.harvest.app_id) {
        Ok(key) => key,
        Err(err) => {
            issue_or_err(&mut report, err.into())?;
            return Ok(report);
        }
    };

    let cache = PageCache::new(&paths.cache_dir);
    let start = opts.start_page.max(1);
    let end = match opts.end_page {
        Some(end) => end,
        None => cache
            .last_page(owner, PageKind::Photostream)?
            .unwrap_or(start),
    };
    if end < start {
        report.issue(format!("end page {end} is before start page {start}"));
        return Ok(report);
    }

    let client = FlickrClient::new(
        &cfg.harvest.api_base_url,
        &api_key,
        cfg.harvest.request_timeout_secs,
    )?;
    let harvester = Harvester::new(client, cache, HarvestOptions::from(&cfg.harvest))
        .with_audit_dir(&paths.logs_dir);

    report.detail(format!("owner={owner}"));
    report.detail(format!("pages={start}..={end}"));

    let mut out: Box<dyn Write> = if opts.progress_to_stderr {
        Box::new(io::stderr().lock())
    } else {
        Box::new(io::stdout().lock())
    };
    let mut records = 0usize;
    let mut degraded = 0usize;
    for page in start..=end {
        match harvester.fetch_detail_summaries(owner, page, out.as_mut()) {
            Ok(summary) => {
                records += summary.records.len();
                degraded += summary.degraded_lines;
                report.detail(format!(
                    "--> wrote {} records={}",
                    summary.write.path.display(),
                    summary.records.len()
                ));
            }
            Err(err) => {
                let resume = format!("stopped at page {page}; resume with --start-page {page}");
                report.detail(resume);
                if let Err(err) = issue_or_err(&mut report, err) {
                    report.issue(format!("page {page} failed: {err:#}"));
                }
                break;
            }
        }
    }
    report.detail(format!("records_written={records}"));
    report.detail(format!("display_lines_degraded={degraded}"));

    Ok(report)
}
