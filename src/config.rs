//! Resolver configuration: upstream endpoints, headers and traversal guards.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::{ResolveError, Result};

/// Main API host.
const DEFAULT_WWW_BASE: &str = "https://www.terabox.com";

/// Host serving the mobile share page used for token negotiation.
const DEFAULT_WAP_BASE: &str = "https://www.terabox.app";

/// Web client app id expected by every share endpoint.
const DEFAULT_APP_ID: &str = "250528";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Read-only settings shared by every resolution request.
///
/// All fields have defaults, so a TOML file only needs to list what it
/// overrides:
///
/// ```toml
/// www_base = "https://www.1024tera.com"
/// metadata_timeout_secs = 20
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub www_base: String,
    pub wap_base: String,
    pub app_id: String,
    pub user_agent: String,
    /// Value of the `lang` cookie sent with negotiated sessions.
    pub lang: String,
    pub metadata_timeout_secs: u64,
    /// Timeout for the redirect probe of the short code extractor.
    pub probe_timeout_secs: u64,
    pub max_depth: usize,
    pub max_entries: usize,
    /// Concurrent child listings per tree level.
    pub listing_concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            www_base: DEFAULT_WWW_BASE.to_string(),
            wap_base: DEFAULT_WAP_BASE.to_string(),
            app_id: DEFAULT_APP_ID.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            lang: "en".to_string(),
            metadata_timeout_secs: 15,
            probe_timeout_secs: 10,
            max_depth: 32,
            max_entries: 10_000,
            listing_concurrency: 3,
        }
    }
}

impl ResolverConfig {
    /// Load a config from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ResolverConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Config pointing every endpoint at one base URL.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            www_base: base.clone(),
            wap_base: base,
            ..Self::default()
        }
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Build the pooled client used for metadata calls. It carries no cookie
    /// store; session cookies are passed explicitly per request.
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.metadata_timeout())
            .build()
            .map_err(|e| ResolveError::NetworkError(format!("Failed to build HTTP client: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ResolverConfig = toml::from_str(
            r#"
            www_base = "https://www.1024tera.com"
            max_depth = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.www_base, "https://www.1024tera.com");
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.app_id, DEFAULT_APP_ID);
        assert_eq!(config.wap_base, DEFAULT_WAP_BASE);
    }

    #[test]
    fn test_with_base_trims_slash() {
        let config = ResolverConfig::with_base("http://127.0.0.1:1234/");
        assert_eq!(config.www_base, "http://127.0.0.1:1234");
        assert_eq!(config.wap_base, "http://127.0.0.1:1234");
    }

    #[test]
    fn test_invalid_toml() {
        let result: std::result::Result<ResolverConfig, _> = toml::from_str("max_depth = \"deep\"");
        assert!(result.is_err());
    }
}
