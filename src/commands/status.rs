use anyhow::Result;
use std::env;

use crate::commands::{CommandReport, load_context, resolve_owners};
use crate::photos::cache::{PageCache, PageKind};

include!(concat!(env!("OUT_DIR"), "/env_allowlist.rs"));

/// Allowlisted variables that are currently set, values omitted.
pub fn set_env_vars() -> Vec<&'static str> {
    GENERATED_ENV_ALLOWLIST
        .iter()
        .copied()
        .filter(|key| env::var_os(key).is_some())
        .collect()
}

pub fn run() -> Result<CommandReport> {
    let (paths, cfg) = load_context()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("build_id={}", env!("BUILD_UUID")));
    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("cache_dir={}", paths.cache_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!("config_file={}", paths.config_file.display()));
    report.detail(format!(
        "credentials_file={}",
        paths.credentials_file.display()
    ));
    let archive_root = paths
        .archive_root
        .clone()
        .or_else(|| cfg.reconcile.archive_root.clone());
    report.detail(format!(
        "archive_root={}",
        archive_root
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unset".to_string())
    ));
    report.detail(format!("env.set={}", set_env_vars().join(",")));

    if !paths.cache_dir.exists() {
        report.issue("missing cache dir; run harvest-listing first");
    }
    if !paths.credentials_file.exists() && env::var_os("PHOTOTAGS_API_KEY").is_none() {
        report.issue("missing credentials file and PHOTOTAGS_API_KEY is unset");
    }
    if let Some(root) = archive_root.as_ref().filter(|root| !root.is_dir()) {
        report.issue(format!("archive root {} is not a directory", root.display()));
    }

    let cache = PageCache::new(&paths.cache_dir);
    for owner in resolve_owners(&[], &cfg) {
        let listing = cache.pages(&owner, PageKind::Photostream)?.len();
        let tags = cache.pages(&owner, PageKind::Tags)?.len();
        report.detail(format!(
            "owner={owner} photostream_pages={listing} tags_pages={tags}"
        ));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::GENERATED_ENV_ALLOWLIST;

    #[test]
    fn allowlist_covers_path_and_config_overrides() {
        for key in [
            "PHOTOTAGS_HOME",
            "PHOTOTAGS_CACHE_DIR",
            "PHOTOTAGS_API_KEY",
            "PHOTOTAGS_TOLERANCE_ENABLED",
        ] {
            assert!(GENERATED_ENV_ALLOWLIST.contains(&key), "{key} missing");
        }
    }
}
