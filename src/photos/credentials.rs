//! API key lookup.
//!
//! Keys live in a TOML file with one table per application id:
//!
//! ```toml
//! [phototags]
//! api_key = "0123456789abcdef"
//! ```
//!
//! `PHOTOTAGS_API_KEY` wins over the file when set.

use crate::error::HarvestError;
use std::env;
use std::fs;
use std::path::Path;

fn key_from_table(table: &toml::Table, app_id: &str) -> Result<String, HarvestError> {
    let section = table
        .get(app_id)
        .and_then(toml::Value::as_table)
        .ok_or_else(|| {
            HarvestError::Configuration(format!("could not find api_key for `{app_id}`"))
        })?;
    let key = section
        .get("api_key")
        .and_then(toml::Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if key.is_empty() {
        return Err(HarvestError::Configuration(format!(
            "api_key for `{app_id}` is missing or empty"
        )));
    }
    Ok(key.to_string())
}

pub fn lookup_api_key(credentials_file: &Path, app_id: &str) -> Result<String, HarvestError> {
    if let Ok(key) = env::var("PHOTOTAGS_API_KEY") {
        let trimmed = key.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    if !credentials_file.is_file() {
        return Err(HarvestError::Configuration(format!(
            "credentials file not found: {}",
            credentials_file.display()
        )));
    }
    let raw = fs::read_to_string(credentials_file).map_err(|err| {
        HarvestError::Configuration(format!(
            "failed to read {}: {err}",
            credentials_file.display()
        ))
    })?;
    let table: toml::Table = raw.parse().map_err(|err| {
        HarvestError::Configuration(format!(
            "failed to parse {}: {err}",
            credentials_file.display()
        ))
    })?;
    key_from_table(&table, app_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(raw: &str) -> toml::Table {
        raw.parse().expect("toml")
    }

    #[test]
    fn finds_key_in_app_section() {
        let t = table("[archive-bot]\napi_key = \" abc123 \"\n");
        assert_eq!(key_from_table(&t, "archive-bot").expect("key"), "abc123");
    }

    #[test]
    fn missing_section_is_configuration_error() {
        let t = table("[other]\napi_key = \"abc\"\n");
        let err = key_from_table(&t, "archive-bot").unwrap_err();
        assert!(matches!(err, HarvestError::Configuration(_)));
        assert!(err.to_string().contains("archive-bot"));
    }

    #[test]
    fn empty_key_is_configuration_error() {
        let t = table("[archive-bot]\napi_key = \"\"\n");
        assert!(matches!(
            key_from_table(&t, "archive-bot"),
            Err(HarvestError::Configuration(_))
        ));
    }
}
