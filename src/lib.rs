//! terabox_link - Resolve TeraBox share links into direct download links.
//!
//! This library provides functionality to:
//! - Extract the short code from any share URL shape (following redirects if needed)
//! - Negotiate the session tokens the share endpoints require
//! - List folder shares recursively
//! - Resolve files through an ordered chain of strategies (authenticated, public, bypass)
//!
//! # Example
//!
//! ```no_run
//! use terabox_link::{LinkResolver, ResolverConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let resolver = LinkResolver::new(ResolverConfig::default())?;
//!
//!     let resolution = resolver
//!         .resolve("https://www.terabox.com/s/1abcXYZ", None)
//!         .await?;
//!     for file in resolution.files() {
//!         println!("{}", file);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod chain;
pub mod config;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod models;
pub mod resolver;
pub mod strategy;
pub mod traversal;
pub mod url_parser;

// Re-exports for convenience
pub use chain::{ResolutionChain, ResolveRequest};
pub use config::ResolverConfig;
pub use downloader::{DownloadReport, Downloader, HttpDownloader};
pub use error::{ResolveError, Result};
pub use models::{FileEntry, Resolution, ResolutionOutcome, ResolvedFile, ShareReference, SkippedFile};
pub use resolver::LinkResolver;
pub use strategy::{ResolutionStrategy, StrategyContext};
pub use tokio_util::sync::CancellationToken;
pub use url_parser::match_short_code;
