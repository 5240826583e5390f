//! Short code extraction from share URLs.

use regex::Regex;
use reqwest::{Client, Url};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::models::ShareReference;

/// `...?surl=<code>` on any host.
static PARAM_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&]surl=([a-zA-Z0-9_-]+)").expect("Invalid param URL regex")
});

/// `https://<host>/s/1<code>`; the leading `1` marks a share and is not part of the code.
static PATH_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^/?#]+/s/1([a-zA-Z0-9_-]+)").expect("Invalid path URL regex")
});

/// `https://<host>/wap/s/1<code>`, `/sharing/embed/1<code>` and similar.
static PREFIXED_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^/?#]+/(?:wap|web|sharing)/(?:s|embed)/1([a-zA-Z0-9_-]+)")
        .expect("Invalid prefixed URL regex")
});

static CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid code regex"));

/// Match a short code against the literal URL text, without network access.
///
/// Supports the following formats:
/// - `https://www.terabox.com/sharing/link?surl=<CODE>`
/// - `https://www.terabox.com/s/1<CODE>`
/// - `https://www.terabox.app/wap/s/1<CODE>`
/// - Raw code string
///
/// # Examples
///
/// ```
/// use terabox_link::url_parser::match_short_code;
///
/// let code = match_short_code("https://www.terabox.com/s/1abcXYZ").unwrap();
/// assert_eq!(code, "abcXYZ");
///
/// let code = match_short_code("https://terabox.app/sharing/link?surl=abcXYZ").unwrap();
/// assert_eq!(code, "abcXYZ");
/// ```
pub fn match_short_code(url: &str) -> Option<String> {
    let trimmed = url.trim();

    if let Some(code) = match_url(trimmed) {
        return Some(code);
    }

    // Check if it's a raw code
    if !trimmed.is_empty() && CODE_REGEX.is_match(trimmed) {
        return Some(trimmed.to_string());
    }

    None
}

fn match_url(url: &str) -> Option<String> {
    [&*PARAM_URL_REGEX, &*PATH_URL_REGEX, &*PREFIXED_URL_REGEX]
        .iter()
        .find_map(|re| re.captures(url).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_string())
}

/// Derives share references, following redirects when the URL text alone
/// carries no code (e.g. mirror-domain short links).
pub struct ShortCodeExtractor {
    http: Client,
}

impl ShortCodeExtractor {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.probe_timeout())
            .build()
            .map_err(|e| ResolveError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Extract the short code from `url`, probing redirects at most once.
    pub async fn extract(&self, url: &str) -> Result<ShareReference> {
        let trimmed = url.trim();

        if let Some(code) = match_short_code(trimmed) {
            return ShareReference::new(trimmed, code);
        }

        let Ok(parsed) = Url::parse(trimmed) else {
            return Err(ResolveError::NoShortCode(url.to_string()));
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ResolveError::NoShortCode(url.to_string()));
        }

        debug!(url = %trimmed, "no short code in URL text, probing redirects");
        let final_url = match self.http.get(parsed).send().await {
            Ok(response) => response.url().to_string(),
            Err(e) => {
                warn!(url = %trimmed, error = %e, "redirect probe failed");
                return Err(ResolveError::NoShortCode(url.to_string()));
            }
        };

        match match_url(&final_url) {
            Some(code) => {
                debug!(final_url = %final_url, code = %code, "short code found after redirect");
                ShareReference::new(trimmed, code)
            }
            None => Err(ResolveError::NoShortCode(url.to_string())),
        }
    }
}
