/**
 * Unified Downloader
 *
 * Provides common download functionality with progress reporting.
 * Used by the fetch pipeline for every remote resource.
 *
 * Bodies are streamed into `<dest>.part` and renamed once complete, so an
 * interrupted run never leaves a truncated file under the final name.
 */

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use super::resource::partial_path;
use crate::error::{DataError, Result};

/// Download progress information
#[derive(Debug, Clone, serde::Serialize)]
pub struct DownloadProgress {
    pub downloaded: u64,
    /// 0 when the server did not send a Content-Length
    pub total: u64,
    pub percent: f64,
    pub speed_mbps: f64,
}

/// Shared cancellation flag, checked between chunks and between steps
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` once the flag is set
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DataError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Per-download options
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub expected_sha256: Option<String>,
    pub cancel: CancelFlag,
}

/// Retry behaviour for transient failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub retries: u32,
    /// Delay before the first retry, doubled for every following one
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// What a finished download produced
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

/// Build the HTTP client shared by every download of a run
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| DataError::request("<client>", e))
}

fn make_progress(downloaded: u64, total: u64, start_time: Instant) -> DownloadProgress {
    let elapsed = start_time.elapsed().as_secs_f64();
    let speed_mbps = if elapsed > 0.0 {
        (downloaded as f64 / elapsed) / 1_000_000.0
    } else {
        0.0
    };
    let percent = if total > 0 {
        (downloaded as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    DownloadProgress {
        downloaded,
        total,
        percent,
        speed_mbps,
    }
}

/// Stream `url` into `part`, returning the byte count and the SHA-256 of the body
async fn stream_to_file<F>(
    client: &Client,
    url: &str,
    part: &Path,
    cancel: &CancelFlag,
    progress_callback: Option<&F>,
) -> Result<(u64, String)>
where
    F: Fn(DownloadProgress) + Send + Sync,
{
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DataError::request(url, e))?;

    if !response.status().is_success() {
        return Err(DataError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let total_size = response.content_length().unwrap_or(0);

    let mut file = tokio::fs::File::create(part)
        .await
        .map_err(|e| DataError::io(part, e))?;

    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;
    let start_time = Instant::now();
    let mut last_progress_time = start_time;

    while let Some(item) = stream.next().await {
        cancel.check()?;
        let chunk = item.map_err(|e| DataError::request(url, e))?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DataError::io(part, e))?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;

        // Report progress every 100ms
        let now = Instant::now();
        if now.duration_since(last_progress_time).as_millis() >= 100 {
            last_progress_time = now;
            if let Some(callback) = progress_callback {
                callback(make_progress(downloaded, total_size, start_time));
            }
        }
    }

    file.flush().await.map_err(|e| DataError::io(part, e))?;

    if let Some(callback) = progress_callback {
        let total = if total_size == 0 { downloaded } else { total_size };
        callback(make_progress(downloaded, total, start_time));
    }

    Ok((downloaded, hex::encode(hasher.finalize())))
}

/// Download a file with progress reporting
pub async fn download_file<F>(
    client: &Client,
    url: &str,
    dest: &Path,
    options: &DownloadOptions,
    progress_callback: Option<&F>,
) -> Result<DownloadOutcome>
where
    F: Fn(DownloadProgress) + Send + Sync,
{
    // Ensure parent directory exists
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
    }

    tracing::info!("[Downloader] start: {} -> {:?}", url, dest);

    let part = partial_path(dest);
    let (bytes, sha256) =
        match stream_to_file(client, url, &part, &options.cancel, progress_callback).await {
            Ok(done) => done,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };

    if let Some(expected) = &options.expected_sha256 {
        if !sha256.eq_ignore_ascii_case(expected.trim()) {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(DataError::ChecksumMismatch {
                path: dest.to_path_buf(),
                expected: expected.clone(),
                actual: sha256,
            });
        }
    }

    tokio::fs::rename(&part, dest)
        .await
        .map_err(|e| DataError::io(dest, e))?;

    tracing::info!("[Downloader] done: {:?} ({} bytes)", dest, bytes);
    Ok(DownloadOutcome {
        path: dest.to_path_buf(),
        bytes,
        sha256,
    })
}

/// Download a file, retrying transient failures with exponential backoff
pub async fn download_with_retry<F>(
    client: &Client,
    url: &str,
    dest: &Path,
    options: &DownloadOptions,
    policy: &RetryPolicy,
    progress_callback: Option<&F>,
) -> Result<DownloadOutcome>
where
    F: Fn(DownloadProgress) + Send + Sync,
{
    let mut attempt: u32 = 0;
    loop {
        options.cancel.check()?;
        match download_file(client, url, dest, options, progress_callback).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) if e.is_transient() && attempt < policy.retries => {
                let delay = policy.delay_for(attempt);
                attempt += 1;
                tracing::warn!(
                    "[Downloader] attempt {}/{} for {} failed: {}; retrying in {:?}",
                    attempt,
                    policy.retries + 1,
                    url,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
