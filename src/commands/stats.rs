use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, load_context, resolve_owners};
use crate::photos::aggregate::{aggregate, csv_lines, keyword_report_lines, owner_summary_lines};
use crate::photos::cache::PageCache;
use crate::photos::record::YearMonth;
use crate::photos::util::write_atomic;

#[derive(Debug, Clone, Default)]
pub struct StatsOptions {
    pub owners: Vec<String>,
    pub start: Option<YearMonth>,
    pub end: Option<YearMonth>,
    pub top: Option<usize>,
    pub csv_out: Option<PathBuf>,
}

pub fn run(opts: &StatsOptions) -> Result<CommandReport> {
    let (paths, cfg) = load_context()?;
    let mut report = CommandReport::new("stats");

    let owners = resolve_owners(&opts.owners, &cfg);
    if owners.is_empty() {
        report.issue("no owners given; pass --owner or set stats.owners");
        return Ok(report);
    }
    let start = opts.start.unwrap_or(cfg.stats.start);
    let end = opts.end.unwrap_or(cfg.stats.end);
    if start > end {
        report.issue(format!("start {start} is after end {end}"));
        return Ok(report);
    }
    let top = opts.top.unwrap_or(cfg.stats.top_keywords);

    let cache = PageCache::new(&paths.cache_dir);
    let agg = aggregate(&cache, &owners, start, end)?;

    for line in owner_summary_lines(&agg) {
        report.detail(line);
    }
    for line in keyword_report_lines(&agg, top) {
        report.detail(line);
    }
    let grid = csv_lines(&agg);
    if let Some(path) = &opts.csv_out {
        let mut body = grid.join("\n");
        body.push('\n');
        write_atomic(path, body.as_bytes())?;
        report.detail(format!("--> wrote {}", path.display()));
    } else {
        for line in grid {
            report.detail(line);
        }
    }

    Ok(report)
}
