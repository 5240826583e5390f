use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{COOKIE, ORIGIN, REFERER};
use reqwest::Client;
use tracing::{info, warn};

use super::{fetch_json, ResolutionStrategy, StrategyContext};
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::models::{ResolvedFile, ShareDownloadResponse, ShareReference};

/// `sharedownload` with the `chunlei` channel and browser-like referer/origin,
/// for deployments that reject the plain public call.
pub struct BypassStrategy {
    http: Client,
    config: Arc<ResolverConfig>,
}

impl BypassStrategy {
    pub fn new(http: Client, config: Arc<ResolverConfig>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl ResolutionStrategy for BypassStrategy {
    fn name(&self) -> &'static str {
        "bypass"
    }

    async fn attempt(
        &self,
        share: &ShareReference,
        ctx: &StrategyContext<'_>,
    ) -> Result<Option<ResolvedFile>> {
        let base = &self.config.www_base;
        let mut request = self
            .http
            .get(format!("{}/api/sharedownload", base))
            .query(&[
                ("surl", share.short_code()),
                ("channel", "chunlei"),
                ("web", "1"),
                ("app_id", self.config.app_id.as_str()),
                ("clienttype", "0"),
            ])
            .header(REFERER, format!("{}/", base))
            .header(ORIGIN, base.as_str());
        if let Some(cookie) = ctx.cookie() {
            request = request.header(COOKIE, cookie);
        }

        let Some(resp) = fetch_json::<ShareDownloadResponse>(request, self.name()).await? else {
            return Ok(None);
        };

        match parse_bypass(&resp) {
            Some(file) => {
                info!(short_code = share.short_code(), filename = %file.filename, "resolved via bypass");
                Ok(Some(file))
            }
            None => {
                warn!(
                    errno = resp.errno,
                    errmsg = resp.errmsg.as_deref().unwrap_or("no dlink"),
                    "bypass share download rejected"
                );
                Ok(None)
            }
        }
    }
}

/// This channel reports the file inside `list[0]`; top-level fields are a fallback.
fn parse_bypass(resp: &ShareDownloadResponse) -> Option<ResolvedFile> {
    if resp.errno != 0 {
        return None;
    }
    let direct_link = resp.dlink.clone().filter(|l| !l.is_empty())?;
    let nested = resp.list.first();

    let filename = nested
        .and_then(|e| e.server_filename.clone())
        .filter(|f| !f.is_empty())
        .or_else(|| resp.filename.clone())
        .filter(|f| !f.is_empty())?;
    let size_bytes = nested.and_then(|e| e.size).or(resp.size);

    Some(ResolvedFile {
        filename,
        size_bytes,
        direct_link,
    })
}
