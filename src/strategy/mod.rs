//! Resolution strategies: independent ways of turning a short code into a direct link.
//!
//! Each strategy reflects one observed upstream API contract and owns the
//! parser for that contract's response shape. `Ok(None)` from
//! [`ResolutionStrategy::attempt`] means the upstream declined and the next
//! strategy should be tried; `Err` is reserved for transport failures.

mod authenticated;
mod bypass;
mod public;
mod share_link;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::Result;
use crate::models::{AuthContext, ResolvedFile, ShareReference};

pub use authenticated::AuthenticatedStrategy;
pub use bypass::BypassStrategy;
pub use public::PublicStrategy;
pub use share_link::ShareLinkGenerator;

/// Per-call inputs shared by all strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyContext<'a> {
    pub credentials: Option<&'a str>,
    pub auth: Option<&'a AuthContext>,
}

impl<'a> StrategyContext<'a> {
    pub fn new(credentials: Option<&'a str>, auth: Option<&'a AuthContext>) -> Self {
        Self {
            credentials: credentials.map(str::trim).filter(|c| !c.is_empty()),
            auth,
        }
    }

    /// Cookie header to send, if there is anything to send.
    pub fn cookie(&self) -> Option<String> {
        match (self.auth, self.credentials) {
            (Some(auth), creds) => Some(auth.cookie_header(creds)),
            (None, Some(creds)) => Some(creds.to_string()),
            (None, None) => None,
        }
    }
}

/// One method of resolving a share to a direct link.
#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Strategies that need a caller credential are skipped without one.
    fn requires_credentials(&self) -> bool {
        false
    }

    async fn attempt(
        &self,
        share: &ShareReference,
        ctx: &StrategyContext<'_>,
    ) -> Result<Option<ResolvedFile>>;
}

/// The standard chain: authenticated, public, bypass.
pub fn default_strategies(
    http: Client,
    config: Arc<ResolverConfig>,
) -> Vec<Box<dyn ResolutionStrategy>> {
    vec![
        Box::new(AuthenticatedStrategy::new(http.clone(), Arc::clone(&config))),
        Box::new(PublicStrategy::new(http.clone(), Arc::clone(&config))),
        Box::new(BypassStrategy::new(http, config)),
    ]
}

/// Send a request and decode its JSON body. Transport failures are errors;
/// non-success statuses and unreadable bodies count as a rejection.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    strategy: &str,
) -> Result<Option<T>> {
    let response = request.send().await?;
    let status = response.status();
    debug!(strategy, %status, url = %response.url(), "upstream responded");

    if !status.is_success() {
        warn!(strategy, %status, "upstream returned error status");
        return Ok(None);
    }

    match response.json::<T>().await {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) if e.is_decode() => {
            warn!(strategy, error = %e, "upstream body is not the expected JSON");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
