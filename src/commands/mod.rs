pub mod harvest_details;
pub mod harvest_listing;
pub mod reconcile;
pub mod stats;
pub mod status;

use anyhow::Result;
use serde::Serialize;

use crate::error::{HarvestError, harvest_error};
use crate::photos::config::{ToolConfig, load_config};
use crate::photos::paths::{ToolPaths, resolve_paths};

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

pub fn load_context() -> Result<(ToolPaths, ToolConfig)> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths.config_file)?;
    Ok((paths, cfg))
}

/// Configuration and ordering problems become report issues; anything else
/// is handed back to the caller.
pub fn issue_or_err(report: &mut CommandReport, err: anyhow::Error) -> Result<()> {
    match harvest_error(&err) {
        Some(typed @ (HarvestError::Configuration(_) | HarvestError::MissingDependency { .. })) => {
            report.issue(format!("{}: {err:#}", typed.code().as_str()));
            Ok(())
        }
        _ => Err(err),
    }
}

/// `--owner` flags win; otherwise the configured owner list.
pub fn resolve_owners(flags: &[String], cfg: &ToolConfig) -> Vec<String> {
    let source = if flags.is_empty() {
        &cfg.stats.owners
    } else {
        flags
    };
    let mut out: Vec<String> = Vec::new();
    for owner in source.iter().map(|o| o.trim()).filter(|o| !o.is_empty()) {
        if !out.iter().any(|seen| seen == owner) {
            out.push(owner.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn issue_flips_ok() {
        let mut report = CommandReport::new("stats");
        report.detail("x");
        assert!(report.ok);
        report.issue("y");
        assert!(!report.ok);
    }

    #[test]
    fn ordering_errors_become_issues() {
        let mut report = CommandReport::new("harvest-details");
        let err = anyhow::Error::from(HarvestError::MissingDependency {
            owner: "alice".into(),
            page: 2,
            path: PathBuf::from("/c/alice-photostream-page002.json"),
        });
        issue_or_err(&mut report, err).expect("handled");
        assert!(!report.ok);
        assert!(report.issues[0].starts_with("E002_MISSING_DEPENDENCY"));

        let mut report = CommandReport::new("stats");
        let err = anyhow::Error::from(HarvestError::MalformedCache {
            path: PathBuf::from("/c/x.json"),
            reason: "eof".into(),
        });
        assert!(issue_or_err(&mut report, err).is_err());
    }

    #[test]
    fn owner_flags_override_config() {
        let mut cfg = ToolConfig::default();
        cfg.stats.owners = vec!["dogerino".into(), "dougerino".into()];
        assert_eq!(resolve_owners(&[], &cfg), vec!["dogerino", "dougerino"]);
        let flags = vec!["bob".to_string(), " bob ".to_string(), "".to_string()];
        assert_eq!(resolve_owners(&flags, &cfg), vec!["bob"]);
    }
}
