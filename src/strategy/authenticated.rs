use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::Client;
use tracing::{info, warn};

use super::{fetch_json, ResolutionStrategy, StrategyContext};
use crate::config::ResolverConfig;
use crate::error::Result;
use crate::models::{DownloadResponse, ListResponse, RawEntry, ResolvedFile, ShareReference};

/// Resolves with the caller's cookie through `filemetas` + `download`.
pub struct AuthenticatedStrategy {
    http: Client,
    config: Arc<ResolverConfig>,
}

impl AuthenticatedStrategy {
    pub fn new(http: Client, config: Arc<ResolverConfig>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl ResolutionStrategy for AuthenticatedStrategy {
    fn name(&self) -> &'static str {
        "authenticated"
    }

    fn requires_credentials(&self) -> bool {
        true
    }

    async fn attempt(
        &self,
        share: &ShareReference,
        ctx: &StrategyContext<'_>,
    ) -> Result<Option<ResolvedFile>> {
        if ctx.credentials.is_none() {
            return Ok(None);
        }
        let Some(cookie) = ctx.cookie() else {
            return Ok(None);
        };

        let request = self
            .http
            .get(format!("{}/api/filemetas", self.config.www_base))
            .query(&[("surl", share.short_code()), ("dir", "1")])
            .header(COOKIE, &cookie);

        let Some(metas) = fetch_json::<ListResponse>(request, self.name()).await? else {
            return Ok(None);
        };
        let Some(file) = first_file(&metas) else {
            warn!(
                errno = metas.errno,
                errmsg = metas.errmsg.as_deref().unwrap_or("no file"),
                "filemetas returned no usable file"
            );
            return Ok(None);
        };
        let (Some(fs_id), Some(filename)) = (file.fs_id, file.server_filename.clone()) else {
            warn!("filemetas entry lacks fs_id or filename");
            return Ok(None);
        };

        let fidlist = format!("[{}]", fs_id);
        let mut request = self
            .http
            .get(format!("{}/api/download", self.config.www_base))
            .query(&[("fidlist", fidlist.as_str())])
            .header(COOKIE, &cookie);
        if let Some(auth) = ctx.auth {
            request = request.query(&[("jsToken", auth.js_token.as_str())]);
        }

        let Some(download) = fetch_json::<DownloadResponse>(request, self.name()).await? else {
            return Ok(None);
        };
        let Some(direct_link) = parse_download_link(&download) else {
            warn!(
                errno = download.errno,
                errmsg = download.errmsg.as_deref().unwrap_or("no dlink"),
                "download endpoint returned no link"
            );
            return Ok(None);
        };

        info!(short_code = share.short_code(), %filename, "resolved with credentials");
        Ok(Some(ResolvedFile {
            filename,
            size_bytes: file.size,
            direct_link,
        }))
    }
}

/// First non-directory entry of a successful `filemetas` response.
fn first_file(metas: &ListResponse) -> Option<&RawEntry> {
    if metas.errno != 0 {
        return None;
    }
    metas.list.iter().find(|e| !e.is_directory())
}

fn parse_download_link(resp: &DownloadResponse) -> Option<String> {
    if resp.errno != 0 {
        return None;
    }
    resp.dlink.as_ref()?.first().map(str::to_string)
}
