//! Ordered fallback across resolution strategies, and per-file resolution of folder shares.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ResolveError, Result};
use crate::models::{AuthContext, Resolution, ResolvedFile, ShareListing, ShareReference, SkippedFile};
use crate::strategy::{ResolutionStrategy, ShareLinkGenerator, StrategyContext};
use crate::traversal::flatten;

/// Inputs of one resolution call.
#[derive(Clone, Copy)]
pub struct ResolveRequest<'a> {
    pub credentials: Option<&'a str>,
    pub auth: Option<&'a AuthContext>,
    pub cancel: &'a CancellationToken,
}

/// Tries strategies one at a time in registration order.
pub struct ResolutionChain {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
    links: ShareLinkGenerator,
}

impl ResolutionChain {
    pub fn new(strategies: Vec<Box<dyn ResolutionStrategy>>, links: ShareLinkGenerator) -> Self {
        Self { strategies, links }
    }

    /// Append a strategy after the existing ones.
    pub fn with_strategy(mut self, strategy: Box<dyn ResolutionStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolve a single-file share. Stops at the first strategy that yields a file.
    pub async fn resolve(&self, share: &ShareReference, request: &ResolveRequest<'_>) -> Result<ResolvedFile> {
        let ctx = StrategyContext::new(request.credentials, request.auth);
        let mut attempted = 0usize;

        for strategy in &self.strategies {
            if request.cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }
            if strategy.requires_credentials() && ctx.credentials.is_none() {
                debug!(strategy = strategy.name(), "skipped, no credentials");
                continue;
            }

            attempted += 1;
            info!(strategy = strategy.name(), short_code = share.short_code(), "attempting strategy");

            let outcome = tokio::select! {
                biased;
                _ = request.cancel.cancelled() => return Err(ResolveError::Cancelled),
                outcome = strategy.attempt(share, &ctx) => outcome,
            };

            match outcome {
                Ok(Some(file)) => return Ok(file),
                Ok(None) => info!(strategy = strategy.name(), "strategy declined, trying next"),
                Err(e) => warn!(strategy = strategy.name(), error = %e, "strategy failed, trying next"),
            }
        }

        warn!(attempted, short_code = share.short_code(), "no strategy produced a link");
        Err(ResolveError::AllStrategiesExhausted)
    }

    /// Resolve every file of a folder share. A file whose link cannot be
    /// generated is recorded as skipped and does not stop the batch.
    pub async fn resolve_folder(
        &self,
        listing: &ShareListing,
        auth: &AuthContext,
        credentials: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        let leaves = flatten(&listing.entries);
        if leaves.is_empty() {
            return Err(ResolveError::NoFilesFound);
        }

        info!(files = leaves.len(), "resolving folder share");
        let mut files = Vec::with_capacity(leaves.len());
        let mut skipped = Vec::new();

        for entry in &leaves {
            if cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            let generated = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
                generated = self.links.generate(&listing.meta, auth, credentials, entry.fs_id) => generated,
            };

            match generated {
                Ok(direct_link) => files.push(ResolvedFile {
                    filename: entry.name.clone(),
                    size_bytes: entry.size_bytes,
                    direct_link,
                }),
                Err(e) => {
                    warn!(path = %entry.path, error = %e, "skipping file");
                    skipped.push(SkippedFile {
                        path: entry.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if files.is_empty() {
            let reason = skipped
                .last()
                .map(|s| s.reason.clone())
                .unwrap_or_default();
            return Err(ResolveError::UpstreamRejected(reason));
        }

        Ok(Resolution::Folder { files, skipped })
    }
}
