//! Error types for the terabox_link crate.

use thiserror::Error;

/// Errors that can occur while resolving a share link.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("No short code found in: {0}")]
    NoShortCode(String),

    #[error("Authentication negotiation failed: {0}")]
    AuthNegotiationFailed(String),

    #[error("Upstream rejected the request: {0}")]
    UpstreamRejected(String),

    #[error("No files found in share")]
    NoFilesFound,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("All resolution strategies failed")]
    AllStrategiesExhausted,

    #[error("Resolution cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl ResolveError {
    /// Stable machine-readable tag for the error variant.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::NoShortCode(_) => "no_short_code",
            ResolveError::AuthNegotiationFailed(_) => "auth_negotiation_failed",
            ResolveError::UpstreamRejected(_) => "upstream_rejected",
            ResolveError::NoFilesFound => "no_files_found",
            ResolveError::NetworkError(_) => "network_error",
            ResolveError::AllStrategiesExhausted => "all_strategies_exhausted",
            ResolveError::Cancelled => "cancelled",
            ResolveError::Io(_) => "io",
            ResolveError::ConfigParse(_) => "config_parse",
        }
    }

    /// A body that arrived but did not decode is a rejection, not a network fault.
    pub(crate) fn from_body(err: reqwest::Error, what: &str) -> Self {
        if err.is_decode() {
            ResolveError::UpstreamRejected(format!("Unreadable {}: {}", what, err))
        } else {
            err.into()
        }
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(err: reqwest::Error) -> Self {
        ResolveError::NetworkError(err.to_string())
    }
}

/// Result type alias for ResolveError.
pub type Result<T> = std::result::Result<T, ResolveError>;
