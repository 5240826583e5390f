use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{COOKIE, REFERER};
use reqwest::Client;
use tracing::{info, warn};

use super::{fetch_json, ResolutionStrategy, StrategyContext};
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::models::{ResolvedFile, ShareDownloadResponse, ShareReference};

/// Resolves anonymously through `sharedownload`.
pub struct PublicStrategy {
    http: Client,
    config: Arc<ResolverConfig>,
}

impl PublicStrategy {
    pub fn new(http: Client, config: Arc<ResolverConfig>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl ResolutionStrategy for PublicStrategy {
    fn name(&self) -> &'static str {
        "public"
    }

    async fn attempt(
        &self,
        share: &ShareReference,
        ctx: &StrategyContext<'_>,
    ) -> Result<Option<ResolvedFile>> {
        let referer = format!("{}/s/1{}", self.config.www_base, share.short_code());
        let mut request = self
            .http
            .get(format!("{}/api/sharedownload", self.config.www_base))
            .query(&[("surl", share.short_code())])
            .header(REFERER, referer);
        if let Some(cookie) = ctx.cookie() {
            request = request.header(COOKIE, cookie);
        }

        let Some(resp) = fetch_json::<ShareDownloadResponse>(request, self.name()).await? else {
            return Ok(None);
        };

        match parse_public(&resp) {
            Some(file) => {
                info!(short_code = share.short_code(), filename = %file.filename, "resolved via public share download");
                Ok(Some(file))
            }
            None => {
                warn!(
                    errno = resp.errno,
                    errmsg = resp.errmsg.as_deref().unwrap_or("no dlink"),
                    "public share download rejected"
                );
                Ok(None)
            }
        }
    }
}

/// Filename and size are top-level, or inside a single-element `list`.
fn parse_public(resp: &ShareDownloadResponse) -> Option<ResolvedFile> {
    if resp.errno != 0 {
        return None;
    }
    let direct_link = resp.dlink.clone().filter(|l| !l.is_empty())?;
    let nested = resp.list.first();

    let filename = resp
        .filename
        .clone()
        .filter(|f| !f.is_empty())
        .or_else(|| nested.and_then(|e| e.server_filename.clone()))
        .filter(|f| !f.is_empty())?;
    let size_bytes = resp.size.or_else(|| nested.and_then(|e| e.size));

    Some(ResolvedFile {
        filename,
        size_bytes,
        direct_link,
    })
}
