use anyhow::Result;

use crate::commands::{CommandReport, issue_or_err, load_context};
use crate::photos::cache::PageCache;
use crate::photos::credentials::lookup_api_key;
use crate::photos::harvester::{HarvestOptions, Harvester};
use crate::photos::transport::FlickrClient;

#[derive(Debug, Clone)]
pub struct HarvestListingOptions {
    pub owner: String,
    pub start_page: u32,
}

pub fn run(opts: &HarvestListingOptions) -> Result<CommandReport> {
    let (paths, cfg) = load_context()?;
    let mut report = CommandReport::new("harvest-listing");

    let owner = opts.owner.trim();
    if owner.is_empty() {
        report.issue("owner cannot be empty");
        return Ok(report);
    }

    // Resolve the key before anything touches disk.
    let api_key = match lookup_api_key(&paths.credentials_file, &cfg.harvest.app_id) {
        Ok(key) => key,
        Err(err) => {
            issue_or_err(&mut report, err.into())?;
            return Ok(report);
        }
    };

    let client = FlickrClient::new(
        &cfg.harvest.api_base_url,
        &api_key,
        cfg.harvest.request_timeout_secs,
    )?;
    let harvester = Harvester::new(
        client,
        PageCache::new(&paths.cache_dir),
        HarvestOptions::from(&cfg.harvest),
    )
    .with_audit_dir(&paths.logs_dir);

    report.detail(format!("owner={owner}"));
    report.detail(format!("cache_dir={}", harvester.cache().dir().display()));
    report.detail(format!("page_size={}", cfg.harvest.page_size));
    report.detail(format!("start_page={}", opts.start_page.max(1)));

    let outcome = if opts.start_page > 1 {
        harvester.fetch_listing_from(owner, opts.start_page)?
    } else {
        harvester.fetch_listing(owner)?
    };
    report.detail(format!("total_pages={}", outcome.total_pages));
    report.detail(format!("pages_written={}", outcome.pages.len()));
    for write in &outcome.pages {
        report.detail(format!(
            "--> wrote {} sha256={}",
            write.path.display(),
            write.sha256
        ));
    }

    Ok(report)
}
