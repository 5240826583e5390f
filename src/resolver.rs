//! Single entry point: share URL in, direct link(s) out.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::AuthNegotiator;
use crate::chain::{ResolutionChain, ResolveRequest};
use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use crate::models::{FileEntry, Resolution, ResolutionOutcome};
use crate::strategy::{default_strategies, ShareLinkGenerator};
use crate::traversal::{flatten, is_folder_shaped, FolderTraversal};
use crate::url_parser::ShortCodeExtractor;

/// Resolves share links. Holds only read-only configuration and pooled
/// clients, so one instance can serve concurrent requests behind an `Arc`.
pub struct LinkResolver {
    extractor: ShortCodeExtractor,
    negotiator: AuthNegotiator,
    traversal: FolderTraversal,
    chain: ResolutionChain,
}

impl LinkResolver {
    /// Create a resolver with the standard strategy chain.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let config = Arc::new(config);
        let http = config.http_client()?;
        let chain = ResolutionChain::new(
            default_strategies(http.clone(), Arc::clone(&config)),
            ShareLinkGenerator::new(http, Arc::clone(&config)),
        );
        Self::with_chain(config, chain)
    }

    /// Create a resolver around a custom chain.
    pub fn with_chain(config: Arc<ResolverConfig>, chain: ResolutionChain) -> Result<Self> {
        let http = config.http_client()?;
        Ok(Self {
            extractor: ShortCodeExtractor::new(&config)?,
            negotiator: AuthNegotiator::new(Arc::clone(&config)),
            traversal: FolderTraversal::new(http, config),
            chain,
        })
    }

    /// Resolve `url` into one file or a folder's files.
    pub async fn resolve(&self, url: &str, credentials: Option<&str>) -> ResolutionOutcome {
        self.resolve_with_cancel(url, credentials, &CancellationToken::new())
            .await
    }

    /// Like [`resolve`](Self::resolve), aborting when `cancel` fires.
    pub async fn resolve_with_cancel(
        &self,
        url: &str,
        credentials: Option<&str>,
        cancel: &CancellationToken,
    ) -> ResolutionOutcome {
        let share = until_cancelled(cancel, self.extractor.extract(url)).await??;
        let short_code = share.short_code();
        let credentials = credentials.map(str::trim).filter(|c| !c.is_empty());
        info!(short_code, authenticated = credentials.is_some(), "resolving share");

        let mut auth = None;
        if let Some(creds) = credentials {
            match until_cancelled(cancel, self.negotiator.negotiate(short_code, Some(creds))).await? {
                Ok(ctx) => auth = Some(ctx),
                Err(e) => warn!(short_code, error = %e, "negotiation failed, continuing without session"),
            }
        }

        match until_cancelled(cancel, self.traversal.list_root_with_cancel(short_code, cancel)).await? {
            Ok(listing) if is_folder_shaped(&listing.entries) => {
                let auth = match auth {
                    Some(ctx) => ctx,
                    None => until_cancelled(cancel, self.negotiator.negotiate(short_code, credentials)).await??,
                };
                return self
                    .chain
                    .resolve_folder(&listing, &auth, credentials, cancel)
                    .await;
            }
            Ok(_) => debug!(short_code, "single-file share"),
            Err(ResolveError::Cancelled) => return Err(ResolveError::Cancelled),
            Err(e) => warn!(short_code, error = %e, "root listing unavailable, treating as single file"),
        }

        let request = ResolveRequest {
            credentials,
            auth: auth.as_ref(),
            cancel,
        };
        let file = self.chain.resolve(&share, &request).await?;
        Ok(Resolution::Single(file))
    }

    /// List every file of a share, breadth-first.
    pub async fn list(&self, url: &str) -> Result<Vec<FileEntry>> {
        let share = self.extractor.extract(url).await?;
        let listing = self.traversal.list_root(share.short_code()).await?;
        Ok(flatten(&listing.entries))
    }
}

/// Drive `work` unless `cancel` fires first, in which case the in-flight
/// requests are dropped. The outer `Result` only carries cancellation.
async fn until_cancelled<F, T>(cancel: &CancellationToken, work: F) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ResolveError::Cancelled),
        out = work => Ok(out),
    }
}
