use crate::photos::record::YearMonth;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "https://api.flickr.com/services/rest/";
pub const DEFAULT_IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "nef", "png", "bmp", "gif"];
const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub app_id: String,
    pub page_size: u32,
    pub append_owner_marker: bool,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub photo_limit: Option<usize>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            app_id: "phototags".to_string(),
            page_size: 100,
            append_owner_marker: true,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 30,
            photo_limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub owners: Vec<String>,
    pub start: YearMonth,
    pub end: YearMonth,
    pub top_keywords: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            owners: Vec::new(),
            start: YearMonth {
                year: 2004,
                month: 10,
            },
            end: YearMonth {
                year: 2016,
                month: 8,
            },
            top_keywords: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub archive_root: Option<PathBuf>,
    pub tolerance_enabled: bool,
    pub tolerance_secs: u32,
    pub extensions: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            archive_root: None,
            tolerance_enabled: false,
            tolerance_secs: 5,
            extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolConfig {
    pub harvest: HarvestConfig,
    pub stats: StatsConfig,
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialToolConfig {
    harvest: Option<HarvestConfig>,
    stats: Option<StatsConfig>,
    reconcile: Option<ReconcileConfig>,
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_optional_usize(var: &str, fallback: Option<usize>) -> Option<usize> {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "" | "0" | "none" => None,
            other => other.parse::<usize>().ok().or(fallback),
        },
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_csv(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if out.is_empty() {
                fallback.to_vec()
            } else {
                out
            }
        }
        Err(_) => fallback.to_vec(),
    }
}

fn env_or_year_month(var: &str, fallback: YearMonth) -> Result<YearMonth> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v
            .parse()
            .map_err(|err| anyhow!("invalid {var}: {err}")),
        _ => Ok(fallback),
    }
}

pub fn validate(cfg: &ToolConfig) -> Result<()> {
    if cfg.harvest.app_id.trim().is_empty() {
        return Err(anyhow!("invalid harvest app id: cannot be empty"));
    }
    if cfg.harvest.page_size == 0 || cfg.harvest.page_size > MAX_PAGE_SIZE {
        return Err(anyhow!(
            "invalid harvest page size: require 1 <= page_size <= {MAX_PAGE_SIZE}"
        ));
    }
    if cfg.harvest.request_timeout_secs == 0 {
        return Err(anyhow!("invalid request timeout: must be >= 1 second"));
    }
    if cfg.harvest.api_base_url.trim().is_empty() {
        return Err(anyhow!("invalid api base url: cannot be empty"));
    }
    if cfg.stats.start > cfg.stats.end {
        return Err(anyhow!(
            "invalid stats range: start {} is after end {}",
            cfg.stats.start,
            cfg.stats.end
        ));
    }
    if cfg.stats.top_keywords == 0 {
        return Err(anyhow!("invalid top keywords: must be >= 1"));
    }
    if cfg.reconcile.extensions.iter().all(|e| e.trim().is_empty()) {
        return Err(anyhow!("invalid reconcile extensions: list cannot be empty"));
    }
    Ok(())
}

fn merge_file_config(base: &mut ToolConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PartialToolConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(harvest) = parsed.harvest {
        base.harvest = harvest;
    }
    if let Some(stats) = parsed.stats {
        base.stats = stats;
    }
    if let Some(reconcile) = parsed.reconcile {
        base.reconcile = reconcile;
    }
    Ok(())
}

pub fn load_config(config_file: &Path) -> Result<ToolConfig> {
    let mut cfg = ToolConfig::default();
    merge_file_config(&mut cfg, config_file)?;

    cfg.harvest.app_id = env_or_string("PHOTOTAGS_APP_ID", &cfg.harvest.app_id);
    cfg.harvest.page_size = env_or_u32("PHOTOTAGS_PAGE_SIZE", cfg.harvest.page_size);
    cfg.harvest.append_owner_marker = env_or_bool(
        "PHOTOTAGS_APPEND_OWNER_MARKER",
        cfg.harvest.append_owner_marker,
    );
    cfg.harvest.api_base_url = env_or_string("PHOTOTAGS_API_BASE_URL", &cfg.harvest.api_base_url);
    cfg.harvest.request_timeout_secs = env_or_u64(
        "PHOTOTAGS_REQUEST_TIMEOUT_SECS",
        cfg.harvest.request_timeout_secs,
    );
    cfg.harvest.photo_limit =
        env_or_optional_usize("PHOTOTAGS_PHOTO_LIMIT", cfg.harvest.photo_limit);
    cfg.stats.owners = env_or_csv("PHOTOTAGS_OWNERS", &cfg.stats.owners);
    cfg.stats.start = env_or_year_month("PHOTOTAGS_STATS_START", cfg.stats.start)?;
    cfg.stats.end = env_or_year_month("PHOTOTAGS_STATS_END", cfg.stats.end)?;
    cfg.reconcile.tolerance_enabled = env_or_bool(
        "PHOTOTAGS_TOLERANCE_ENABLED",
        cfg.reconcile.tolerance_enabled,
    );
    cfg.reconcile.tolerance_secs =
        env_or_u32("PHOTOTAGS_TOLERANCE_SECS", cfg.reconcile.tolerance_secs);
    cfg.reconcile.extensions = env_or_csv("PHOTOTAGS_EXTENSIONS", &cfg.reconcile.extensions);

    validate(&cfg)?;
    Ok(cfg)
}
