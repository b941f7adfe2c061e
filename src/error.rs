use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(
        "listing page {page} for owner `{owner}` is not cached ({}); run harvest-listing first",
        path.display()
    )]
    MissingDependency {
        owner: String,
        page: u32,
        path: PathBuf,
    },
    #[error("malformed cache file {}: {reason}", path.display())]
    MalformedCache { path: PathBuf, reason: String },
    #[error("remote api call failed: {0}")]
    Remote(String),
}

impl HarvestError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::E001Configuration,
            Self::MissingDependency { .. } => ErrorCode::E002MissingDependency,
            Self::MalformedCache { .. } => ErrorCode::E003MalformedCache,
            Self::Remote(_) => ErrorCode::E004Remote,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    E001Configuration,
    E002MissingDependency,
    E003MalformedCache,
    E004Remote,
    E005EncodingDegradation,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001Configuration => "E001_CONFIGURATION",
            Self::E002MissingDependency => "E002_MISSING_DEPENDENCY",
            Self::E003MalformedCache => "E003_MALFORMED_CACHE",
            Self::E004Remote => "E004_REMOTE",
            Self::E005EncodingDegradation => "E005_ENCODING_DEGRADATION",
        }
    }
}

/// Find the typed error inside an `anyhow` chain, if any.
pub fn harvest_error(err: &anyhow::Error) -> Option<&HarvestError> {
    err.chain().find_map(|cause| cause.downcast_ref::<HarvestError>())
}
