use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, load_context, resolve_owners};
use crate::photos::cache::{PageCache, PageKind};
use crate::photos::reconcile::{
    FileCandidate, LocalArchive, MatchCounter, ReconcileOptions as MatchOptions, Reconciler,
};
use crate::photos::record::TakenAt;

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub owners: Vec<String>,
    pub timestamp: Option<String>,
    pub archive_root: Option<PathBuf>,
    pub tolerance: bool,
    pub verbose: bool,
}

fn candidate_line(taken_at: &TakenAt, found: &[FileCandidate]) -> String {
    let files: Vec<String> = found
        .iter()
        .map(|c| format!("{} @ {}", c.path.display(), c.modified_at))
        .collect();
    let scope = found.first().map(|c| c.scope.as_str()).unwrap_or("none");
    format!("{taken_at} [{scope}] {}", files.join(", "))
}

pub fn run(opts: &ReconcileOptions) -> Result<CommandReport> {
    let (paths, cfg) = load_context()?;
    let mut report = CommandReport::new("reconcile");

    let Some(root) = opts
        .archive_root
        .clone()
        .or_else(|| paths.archive_root.clone())
        .or_else(|| cfg.reconcile.archive_root.clone())
    else {
        report.issue("archive root not configured; pass --archive-root or set reconcile.archive_root");
        return Ok(report);
    };

    let mut match_options = MatchOptions::from(&cfg.reconcile);
    if opts.tolerance && match_options.tolerance_secs.is_none() {
        match_options.tolerance_secs = Some(cfg.reconcile.tolerance_secs);
    }
    report.detail(format!("archive_root={}", root.display()));
    report.detail(format!(
        "tolerance_secs={}",
        match_options
            .tolerance_secs
            .map(|s| s.to_string())
            .unwrap_or_else(|| "off".to_string())
    ));

    let reconciler = Reconciler::new(LocalArchive, &root, match_options);
    let mut counter = MatchCounter::default();

    if let Some(raw) = &opts.timestamp {
        let taken_at = match TakenAt::parse(raw) {
            Ok(ts) => ts,
            Err(err) => {
                report.issue(format!("{err:#}"));
                return Ok(report);
            }
        };
        let found = reconciler.resolve(&taken_at, &mut counter)?;
        report.detail(candidate_line(&taken_at, &found));
        report.detail(format!("matches={}", found.len()));
        return Ok(report);
    }

    let owners = resolve_owners(&opts.owners, &cfg);
    if owners.is_empty() {
        report.issue("no owners given; pass --owner or set stats.owners");
        return Ok(report);
    }

    let cache = PageCache::new(&paths.cache_dir);
    for owner in &owners {
        for (_, path) in cache.pages(owner, PageKind::Tags)? {
            report.detail(format!("SOURCE -> {}", path.display()));
            for record in cache.read_records(&path)? {
                let found = reconciler.resolve(&record.taken_at, &mut counter)?;
                if opts.verbose {
                    report.detail(format!(
                        "{} {}",
                        record.url,
                        candidate_line(&record.taken_at, &found)
                    ));
                }
            }
        }
    }

    report.detail(format!("total photos processed: {}", counter.processed));
    report.detail(format!("total exact matches:    {}", counter.exact_matches));
    report.detail(format!("total tolerance matches: {}", counter.tolerance_matches));
    report.detail(format!("total unmatched:        {}", counter.unmatched));

    Ok(report)
}
