//! Local page cache.
//!
//! One JSON file per `(owner, kind, page)`:
//! `<owner>-<kind>-page<NNN>.json` with `kind` one of `photostream`
//! (raw listing payload) or `tags` (normalized records). Files are
//! pretty-printed with sorted keys and replaced atomically, so a reader
//! only ever sees a complete page.

use crate::error::HarvestError;
use crate::photos::record::Record;
use crate::photos::util::write_atomic;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Photostream,
    Tags,
}

impl PageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PageKind::Photostream => "photostream",
            PageKind::Tags => "tags",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub owner: String,
    pub kind: PageKind,
    pub page: u32,
}

impl PageKey {
    pub fn new(owner: &str, kind: PageKind, page: u32) -> Self {
        Self {
            owner: owner.to_string(),
            kind,
            page,
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-page{:03}.json",
            self.owner,
            self.kind.as_str(),
            self.page
        )
    }
}

#[derive(Debug, Clone)]
pub struct PageWrite {
    pub key: PageKey,
    pub path: PathBuf,
    pub bytes: usize,
    pub sha256: String,
}

/// Rebuild every object with its keys inserted in sorted order, so output
/// is ordered whether or not serde_json preserves insertion order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, sort_keys(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

pub fn render_page<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>> {
    let value = sort_keys(serde_json::to_value(payload)?);
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn page_path(&self, key: &PageKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub fn write_page<T: Serialize + ?Sized>(&self, key: &PageKey, payload: &T) -> Result<PageWrite> {
        let bytes = render_page(payload)?;
        let path = self.page_path(key);
        write_atomic(&path, &bytes)?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(PageWrite {
            key: key.clone(),
            path,
            bytes: bytes.len(),
            sha256: format!("{:x}", hasher.finalize()),
        })
    }

    /// Raw listing payload for a page that harvest-listing already stored.
    pub fn read_listing(&self, owner: &str, page: u32) -> Result<Value> {
        let key = PageKey::new(owner, PageKind::Photostream, page);
        let path = self.page_path(&key);
        if !path.is_file() {
            return Err(HarvestError::MissingDependency {
                owner: owner.to_string(),
                page,
                path,
            }
            .into());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let parsed = serde_json::from_str(&raw).map_err(|err| HarvestError::MalformedCache {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        Ok(parsed)
    }

    pub fn read_records(&self, path: &Path) -> Result<Vec<Record>> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let records = serde_json::from_str(&raw).map_err(|err| HarvestError::MalformedCache {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Ok(records)
    }

    /// Cached pages of one kind for an owner, ordered by page number.
    pub fn pages(&self, owner: &str, kind: PageKind) -> Result<Vec<(u32, PathBuf)>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{owner}-{}-page", kind.as_str());
        let mut out = Vec::new();
        let entries =
            fs::read_dir(&self.dir).with_context(|| format!("failed to read {}", self.dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(page) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".json"))
                .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|digits| digits.parse::<u32>().ok())
            else {
                continue;
            };
            out.push((page, path));
        }
        out.sort();
        Ok(out)
    }

    pub fn last_page(&self, owner: &str, kind: PageKind) -> Result<Option<u32>> {
        Ok(self.pages(owner, kind)?.last().map(|(page, _)| *page))
    }
}
