//! Paginated fetch into the page cache.
//!
//! Every page is persisted as soon as it arrives, so an interrupted run
//! loses at most the page in flight and can be resumed from any page index.
//! Re-running overwrites pages wholesale.

use crate::error::{ErrorCode, HarvestError};
use crate::photos::audit;
use crate::photos::cache::{PageCache, PageKey, PageKind, PageWrite};
use crate::photos::config::HarvestConfig;
use crate::photos::record::{Record, TakenAt, normalize_keywords, normalize_text, photo_url};
use crate::photos::transport::{
    PhotoSource, listing_photos, listing_total_pages, parse_photo_detail,
};
use crate::photos::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub page_size: u32,
    pub append_owner_marker: bool,
    pub photo_limit: Option<usize>,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self::from(&HarvestConfig::default())
    }
}

impl From<&HarvestConfig> for HarvestOptions {
    fn from(cfg: &HarvestConfig) -> Self {
        Self {
            page_size: cfg.page_size,
            append_owner_marker: cfg.append_owner_marker,
            photo_limit: cfg.photo_limit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingOutcome {
    pub total_pages: u32,
    pub pages: Vec<PageWrite>,
}

#[derive(Debug, Clone)]
pub struct SummaryPage {
    pub write: PageWrite,
    pub records: Vec<Record>,
    pub degraded_lines: usize,
}

pub struct Harvester<S: PhotoSource> {
    source: S,
    cache: PageCache,
    options: HarvestOptions,
    audit_dir: Option<PathBuf>,
}

impl<S: PhotoSource> Harvester<S> {
    pub fn new(source: S, cache: PageCache, options: HarvestOptions) -> Self {
        Self {
            source,
            cache,
            options,
            audit_dir: None,
        }
    }

    pub fn with_audit_dir(mut self, logs_dir: impl Into<PathBuf>) -> Self {
        self.audit_dir = Some(logs_dir.into());
        self
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    fn record_write(&self, phase: &str, write: &PageWrite) {
        let Some(dir) = &self.audit_dir else {
            return;
        };
        let message = format!(
            "path={} bytes={} sha256={}",
            write.path.display(),
            write.bytes,
            write.sha256
        );
        if let Err(err) = audit::append_event(dir, phase, "ok", &message) {
            warn::emit(&WarnEvent {
                code: "AUDIT_WRITE_FAILED",
                stage: phase,
                owner: &write.key.owner,
                page: Some(write.key.page),
                target: &dir.display().to_string(),
                reason: "audit event not recorded",
                err: &err.to_string(),
            });
        }
    }

    /// Fetch and persist every listing page of `owner`.
    pub fn fetch_listing(&self, owner: &str) -> Result<ListingOutcome> {
        self.fetch_listing_from(owner, 1)
    }

    /// Fetch and persist listing pages `start_page..=N`, where `N` is the
    /// total page count reported by the first response of this run.
    pub fn fetch_listing_from(&self, owner: &str, start_page: u32) -> Result<ListingOutcome> {
        let start_page = start_page.max(1);
        let first = self
            .source
            .list_page(owner, start_page, self.options.page_size)
            .with_context(|| format!("listing page {start_page} for `{owner}` failed"))?;
        let total_pages = listing_total_pages(&first).ok_or_else(|| {
            HarvestError::Remote(format!(
                "listing page {start_page} for `{owner}` has no photos.pages field"
            ))
        })?;
        // An owner with no photos still gets page 1 on disk.
        if start_page > total_pages.max(1) {
            anyhow::bail!(
                "start page {start_page} is beyond the {total_pages} listing pages of `{owner}`"
            );
        }

        let mut pages = Vec::new();
        let key = PageKey::new(owner, PageKind::Photostream, start_page);
        let write = self.cache.write_page(&key, &first)?;
        self.record_write("harvest-listing", &write);
        pages.push(write);

        for page in (start_page + 1)..=total_pages {
            let payload = self
                .source
                .list_page(owner, page, self.options.page_size)
                .with_context(|| {
                    format!("listing page {page} for `{owner}` failed; resume with start page {page}")
                })?;
            let key = PageKey::new(owner, PageKind::Photostream, page);
            let write = self.cache.write_page(&key, &payload)?;
            self.record_write("harvest-listing", &write);
            pages.push(write);
        }

        Ok(ListingOutcome { total_pages, pages })
    }

    /// Look up every photo of a cached listing page and persist the
    /// normalized records as the matching `tags` page. Display lines go to
    /// `out`; a line that cannot be written is logged and the record kept.
    pub fn fetch_detail_summaries(
        &self,
        owner: &str,
        listing_page: u32,
        out: &mut dyn Write,
    ) -> Result<SummaryPage> {
        let listing = self.cache.read_listing(owner, listing_page)?;
        let listing_path = self
            .cache
            .page_path(&PageKey::new(owner, PageKind::Photostream, listing_page));
        let photos = listing_photos(&listing).ok_or_else(|| HarvestError::MalformedCache {
            path: listing_path,
            reason: "missing photos.photo list".to_string(),
        })?;

        let limit = self.options.photo_limit.unwrap_or(usize::MAX);
        let mut records = Vec::new();
        let mut degraded_lines = 0usize;

        for photo in photos.iter().take(limit) {
            let detail = self
                .source
                .photo_detail(&photo.id)
                .with_context(|| format!("detail lookup for photo {} failed", photo.id))?;
            let parsed = parse_photo_detail(&detail).ok_or_else(|| {
                HarvestError::Remote(format!("photo {} detail has no dates.taken", photo.id))
            })?;
            let taken_at = TakenAt::parse(&parsed.taken)
                .with_context(|| format!("photo {} has an unusable taken date", photo.id))?;

            let record = Record {
                id: photo.id.clone(),
                owner: owner.to_string(),
                title: normalize_text(&photo.title),
                taken_at,
                keywords: normalize_keywords(
                    &parsed.raw_tags,
                    owner,
                    self.options.append_owner_marker,
                ),
                url: photo_url(owner, &photo.id),
            };

            if let Err(err) = writeln!(out, "{}", record.display_line()) {
                degraded_lines += 1;
                warn::emit(&WarnEvent {
                    code: ErrorCode::E005EncodingDegradation.as_str(),
                    stage: "harvest-details",
                    owner,
                    page: Some(listing_page),
                    target: &record.url,
                    reason: "display line not written; record kept",
                    err: &err.to_string(),
                });
            }
            records.push(record);
        }

        let key = PageKey::new(owner, PageKind::Tags, listing_page);
        let write = self.cache.write_page(&key, &records)?;
        self.record_write("harvest-details", &write);

        Ok(SummaryPage {
            write,
            records,
            degraded_lines,
        })
    }
}
