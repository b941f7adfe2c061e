use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub home: PathBuf,
    pub cache_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub config_file: PathBuf,
    pub credentials_file: PathBuf,
    /// Only set when `PHOTOTAGS_ARCHIVE_ROOT` is given; the config file and
    /// `--archive-root` are the other sources.
    pub archive_root: Option<PathBuf>,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_path(var: &str) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    env_path(var).unwrap_or(fallback)
}

pub fn resolve_paths() -> Result<ToolPaths> {
    let home = match env_path("PHOTOTAGS_HOME") {
        Some(home) => home,
        None => required_home_dir()?.join(".phototags"),
    };

    let cache_dir = env_or_default_path("PHOTOTAGS_CACHE_DIR", home.join("cache"));
    let logs_dir = env_or_default_path("PHOTOTAGS_LOGS_DIR", home.join("logs"));
    let config_file = env_or_default_path("PHOTOTAGS_CONFIG_PATH", home.join("phototags.toml"));
    let credentials_file = env_or_default_path(
        "PHOTOTAGS_CREDENTIALS_FILE",
        home.join("credentials.toml"),
    );
    let archive_root = env_path("PHOTOTAGS_ARCHIVE_ROOT");

    Ok(ToolPaths {
        home,
        cache_dir,
        logs_dir,
        config_file,
        credentials_file,
        archive_root,
    })
}
