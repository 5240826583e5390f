//! Session token negotiation against the mobile share page.

use std::sync::Arc;

use regex::Regex;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::COOKIE;
use reqwest::{Client, Url};
use std::sync::LazyLock;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::models::AuthContext;

/// The token is embedded as a URL-encoded `("<token>")` call in an inline script.
static JS_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%28%22(.*?)%22%29").expect("Invalid token regex"));

const BROWSER_ID_COOKIE: &str = "browserid";

/// Obtains a fresh [`AuthContext`] per resolution call.
#[derive(Clone)]
pub struct AuthNegotiator {
    config: Arc<ResolverConfig>,
}

impl AuthNegotiator {
    pub fn new(config: Arc<ResolverConfig>) -> Self {
        Self { config }
    }

    /// Negotiate tokens for `short_code`. Each call uses its own cookie jar, so
    /// tokens never leak between requests.
    pub async fn negotiate(&self, short_code: &str, credentials: Option<&str>) -> Result<AuthContext> {
        let url = Url::parse(&format!(
            "{}/wap/share/filelist?surl={}",
            self.config.wap_base, short_code
        ))
        .map_err(|e| ResolveError::AuthNegotiationFailed(format!("Invalid negotiation URL: {}", e)))?;

        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .user_agent(&self.config.user_agent)
            .timeout(self.config.metadata_timeout())
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| ResolveError::AuthNegotiationFailed(format!("Failed to build HTTP client: {}", e)))?;

        let mut request = http.get(url.clone());
        if let Some(creds) = credentials.map(str::trim).filter(|c| !c.is_empty()) {
            request = request.header(COOKIE, creds);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResolveError::AuthNegotiationFailed(e.to_string()))?;

        let browser_id = response
            .cookies()
            .find(|c| c.name() == BROWSER_ID_COOKIE)
            .map(|c| c.value().to_string());
        let final_url = response.url().clone();

        let body = response
            .text()
            .await
            .map_err(|e| ResolveError::AuthNegotiationFailed(e.to_string()))?;

        let js_token = extract_js_token(&body).ok_or_else(|| {
            ResolveError::AuthNegotiationFailed("token not found in share page".to_string())
        })?;

        // Cookies may have been set on any hop of the redirect chain.
        let mut jar_cookies: Vec<String> = Vec::new();
        for u in [&url, &final_url] {
            if let Some(value) = jar.cookies(u) {
                if let Ok(s) = value.to_str() {
                    for pair in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                        if !jar_cookies.iter().any(|c| c == pair) {
                            jar_cookies.push(pair.to_string());
                        }
                    }
                }
            }
        }

        let session_cookie = serialize_cookies(&self.config.lang, &jar_cookies);
        debug!(
            short_code,
            has_browser_id = browser_id.is_some(),
            cookies = jar_cookies.len(),
            "negotiated share session"
        );

        Ok(AuthContext {
            js_token,
            browser_id,
            session_cookie,
        })
    }
}

/// Scrape the session token from a share page body.
pub fn extract_js_token(body: &str) -> Option<String> {
    let unescaped = body.replace('\\', "");
    JS_TOKEN_REGEX
        .captures(&unescaped)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|t| !t.is_empty())
}

/// The configured `lang` always wins over one set by upstream.
fn serialize_cookies(lang: &str, pairs: &[String]) -> String {
    let rest: Vec<&str> = pairs
        .iter()
        .map(String::as_str)
        .filter(|pair| pair.split('=').next().map(str::trim) != Some("lang"))
        .collect();
    format!("lang={};{}", lang, rest.join(";"))
}
