//! Download interface consumed by callers, plus a streaming HTTP implementation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{ResolveError, Result};
use crate::models::ResolvedFile;

/// Progress callback: bytes written so far and the expected total, if known.
pub type ProgressFn<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// Result of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub filename: String,
    pub size_bytes: Option<u64>,
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Streams a resolved file to disk.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(
        &self,
        file: &ResolvedFile,
        destination: &Path,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<DownloadReport>;
}

/// Plain HTTP GET downloader. No overall timeout, since byte streams can run long.
pub struct HttpDownloader {
    http: Client,
}

impl HttpDownloader {
    pub fn new(user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ResolveError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(
        &self,
        file: &ResolvedFile,
        destination: &Path,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<DownloadReport> {
        // Determine the final path
        let final_path = if destination.is_dir() {
            destination.join(safe_filename(&file.filename))
        } else {
            destination.to_path_buf()
        };

        let response = self.http.get(&file.direct_link).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::UpstreamRejected(format!(
                "download returned HTTP {}",
                status.as_u16()
            )));
        }

        let total = response.content_length().or(file.size_bytes);

        let written = match stream_to_file(response, &final_path, total, progress).await {
            Ok(written) => written,
            Err(e) => {
                // Partial files are never left behind.
                if let Err(rm) = tokio::fs::remove_file(&final_path).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %final_path.display(), error = %rm, "failed to remove partial download");
                    }
                }
                return Err(e);
            }
        };
        debug!(path = %final_path.display(), bytes = written, "download finished");

        Ok(DownloadReport {
            filename: file.filename.clone(),
            size_bytes: file.size_bytes,
            path: final_path,
            bytes_written: written,
        })
    }
}

async fn stream_to_file(
    response: Response,
    path: &Path,
    total: Option<u64>,
    progress: Option<ProgressFn<'_>>,
) -> Result<u64> {
    let mut out = File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
        if let Some(report) = progress {
            report(written, total);
        }
    }

    out.flush().await?;
    Ok(written)
}

/// Strip path separators so an upstream filename cannot escape the destination directory.
fn safe_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "download".to_string(),
        other => other.to_string(),
    }
}
