use std::sync::Arc;

use reqwest::header::COOKIE;
use reqwest::Client;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::models::{AuthContext, DownloadResponse, ShareMeta};

/// Generates the direct link of one file inside a folder share from the
/// folder's sharing metadata.
#[derive(Clone)]
pub struct ShareLinkGenerator {
    http: Client,
    config: Arc<ResolverConfig>,
}

impl ShareLinkGenerator {
    pub fn new(http: Client, config: Arc<ResolverConfig>) -> Self {
        Self { http, config }
    }

    pub async fn generate(
        &self,
        meta: &ShareMeta,
        auth: &AuthContext,
        credentials: Option<&str>,
        fs_id: u64,
    ) -> Result<String> {
        let fid_list = format!("[{}]", fs_id);
        let response = self
            .http
            .get(format!("{}/share/download", self.config.www_base))
            .query(&[
                ("uk", meta.uk.as_str()),
                ("sign", meta.sign.as_str()),
                ("shareid", meta.share_id.as_str()),
                ("primaryid", meta.share_id.as_str()),
                ("timestamp", meta.timestamp.as_str()),
                ("jsToken", auth.js_token.as_str()),
                ("fid_list", fid_list.as_str()),
                ("app_id", self.config.app_id.as_str()),
                ("channel", "dubox"),
                ("product", "share"),
                ("clienttype", "0"),
                ("dp-logid", ""),
                ("nozip", "0"),
                ("web", "1"),
            ])
            .header(COOKIE, auth.cookie_header(credentials))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::UpstreamRejected(format!("HTTP {}", status.as_u16())));
        }

        let parsed: DownloadResponse = response
            .json()
            .await
            .map_err(|e| ResolveError::from_body(e, "link response"))?;

        if parsed.errno != 0 {
            return Err(ResolveError::UpstreamRejected(format!(
                "errno {}: {}",
                parsed.errno,
                parsed.errmsg.unwrap_or_default()
            )));
        }

        let link = parsed
            .dlink
            .as_ref()
            .and_then(|d| d.first())
            .map(str::to_string)
            .ok_or_else(|| ResolveError::UpstreamRejected("response carries no dlink".to_string()))?;

        debug!(fs_id, "generated share link");
        Ok(link)
    }
}
