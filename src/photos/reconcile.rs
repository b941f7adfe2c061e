//! Timestamp reconciliation against a `root/YYYY/MM/DD` photo archive.
//!
//! Search order for one timestamp:
//! 1. exact mtime match in the day folder
//! 2. within the tolerance window in the day folder (only when enabled)
//! 3. exact mtime match in the month folder
//!
//! The first non-empty step wins and every file it matched is returned.
//! The year folder is never searched.

use crate::photos::config::ReconcileConfig;
use crate::photos::record::TakenAt;
use crate::photos::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory listing and mtime lookup for the archive.
pub trait ArchiveFs {
    /// Regular files directly under `dir`. A missing directory, or a path
    /// that is not a directory, is empty.
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Modification time in the local clock.
    fn modified_at(&self, path: &Path) -> Result<TakenAt>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalArchive;

impl ArchiveFs for LocalArchive {
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", dir.display()));
            }
        };
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                out.push(entry.path());
            }
        }
        Ok(out)
    }

    fn modified_at(&self, path: &Path) -> Result<TakenAt> {
        let modified = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .with_context(|| format!("failed to read mtime of {}", path.display()))?;
        let local: DateTime<Local> = modified.into();
        Ok(TakenAt::from_naive(local.naive_local()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchScope {
    DayExact,
    DayTolerance,
    MonthExact,
}

impl MatchScope {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchScope::DayExact => "day-exact",
            MatchScope::DayTolerance => "day-tolerance",
            MatchScope::MonthExact => "month-exact",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub modified_at: TakenAt,
    pub scope: MatchScope,
}

/// Coverage counters owned by the caller and threaded through every
/// `resolve` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchCounter {
    pub processed: u64,
    pub exact_matches: u64,
    pub tolerance_matches: u64,
    pub unmatched: u64,
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// `None` disables the day-folder tolerance step.
    pub tolerance_secs: Option<u32>,
    pub extensions: Vec<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::from(&ReconcileConfig::default())
    }
}

impl From<&ReconcileConfig> for ReconcileOptions {
    fn from(cfg: &ReconcileConfig) -> Self {
        Self {
            tolerance_secs: cfg.tolerance_enabled.then_some(cfg.tolerance_secs),
            extensions: cfg
                .extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }
}

pub struct Reconciler<F: ArchiveFs> {
    fs: F,
    root: PathBuf,
    options: ReconcileOptions,
}

impl<F: ArchiveFs> Reconciler<F> {
    pub fn new(fs: F, root: impl Into<PathBuf>, options: ReconcileOptions) -> Self {
        Self {
            fs,
            root: root.into(),
            options,
        }
    }

    pub fn month_dir(&self, taken_at: &TakenAt) -> PathBuf {
        let ym = taken_at.year_month();
        self.root
            .join(format!("{:04}", ym.year))
            .join(format!("{:02}", ym.month))
    }

    pub fn day_dir(&self, taken_at: &TakenAt) -> PathBuf {
        self.month_dir(taken_at)
            .join(format!("{:02}", taken_at.day()))
    }

    fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| self.options.extensions.contains(&e))
    }

    /// Image files of `dir` with their mtimes, sorted by path. A directory
    /// that cannot be listed, or a file whose mtime cannot be read, is
    /// skipped with a warning.
    fn scan(&self, dir: &Path) -> Vec<(PathBuf, TakenAt)> {
        let mut files = match self.fs.list_files(dir) {
            Ok(files) => files,
            Err(err) => {
                warn::emit(&WarnEvent {
                    code: "SCOPE_UNREADABLE",
                    stage: "reconcile",
                    owner: "",
                    page: None,
                    target: &dir.display().to_string(),
                    reason: "scope skipped",
                    err: &format!("{err:#}"),
                });
                return Vec::new();
            }
        };
        files.retain(|p| self.is_image(p));
        files.sort();
        let mut out = Vec::with_capacity(files.len());
        for path in files {
            match self.fs.modified_at(&path) {
                Ok(ts) => out.push((path, ts)),
                Err(err) => warn::emit(&WarnEvent {
                    code: "MTIME_UNREADABLE",
                    stage: "reconcile",
                    owner: "",
                    page: None,
                    target: &path.display().to_string(),
                    reason: "file skipped",
                    err: &format!("{err:#}"),
                }),
            }
        }
        out
    }

    fn select<P>(files: &[(PathBuf, TakenAt)], scope: MatchScope, keep: P) -> Vec<FileCandidate>
    where
        P: Fn(&TakenAt) -> bool,
    {
        files
            .iter()
            .filter(|(_, ts)| keep(ts))
            .map(|(path, ts)| FileCandidate {
                path: path.clone(),
                modified_at: *ts,
                scope,
            })
            .collect()
    }

    /// Candidate files for `taken_at`; empty when nothing matches.
    pub fn resolve(&self, taken_at: &TakenAt, counter: &mut MatchCounter) -> Result<Vec<FileCandidate>> {
        counter.processed += 1;

        let day_files = self.scan(&self.day_dir(taken_at));
        let exact = Self::select(&day_files, MatchScope::DayExact, |ts| ts == taken_at);
        if !exact.is_empty() {
            counter.exact_matches += 1;
            return Ok(exact);
        }

        if let Some(window) = self.options.tolerance_secs {
            let window = i64::from(window);
            let near = Self::select(&day_files, MatchScope::DayTolerance, |ts| {
                ts.abs_delta_secs(taken_at) <= window
            });
            if !near.is_empty() {
                counter.tolerance_matches += 1;
                return Ok(near);
            }
        }

        let month_files = self.scan(&self.month_dir(taken_at));
        let month = Self::select(&month_files, MatchScope::MonthExact, |ts| ts == taken_at);
        if !month.is_empty() {
            counter.exact_matches += 1;
            return Ok(month);
        }

        counter.unmatched += 1;
        Ok(Vec::new())
    }
}
