//! Audio download utilities.
//!
//! Downloads are streamed to disk through a [`Fetcher`]. The declared content
//! length is verified after the stream ends and partial files are removed on
//! any failure.

use crate::config::DownloadSettings;
use crate::error::{ClipscribeError, Result};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// Files above this size get a progress bar.
const PROGRESS_THRESHOLD_BYTES: u64 = 1024 * 1024;

/// An open response body.
pub struct FetchBody {
    /// Declared length, if the server sent one.
    pub content_length: Option<u64>,
    /// Body chunks.
    pub stream: BoxStream<'static, Result<Vec<u8>>>,
}

/// Capability to fetch bytes from a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Open the body of `url`; fails on connection errors and non-success status.
    async fn open(&self, url: &str) -> Result<FetchBody>;
}

/// HTTP fetcher backed by reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with explicit timeouts.
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Create a fetcher from download settings.
    pub fn from_settings(settings: &DownloadSettings) -> Result<Self> {
        Self::new(
            Duration::from_secs(settings.connect_timeout_secs),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn open(&self, url: &str) -> Result<FetchBody> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let content_length = response.content_length();

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(ClipscribeError::from))
            .boxed();

        Ok(FetchBody {
            content_length,
            stream,
        })
    }
}

/// Stream `url` into `dest`, returning the number of bytes written.
///
/// Parent directories are created as needed. On a stream error or a
/// content-length mismatch the partial file is deleted.
#[instrument(skip(fetcher, dest), fields(dest = %dest.display()))]
pub async fn download_to(
    fetcher: &dyn Fetcher,
    url: &str,
    dest: &Path,
    show_progress: bool,
) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    info!("Downloading {}", url);

    let result = stream_to_file(fetcher, url, dest, show_progress).await;
    if result.is_err() && dest.exists() {
        if let Err(e) = tokio::fs::remove_file(dest).await {
            warn!("Failed to remove partial download: {}", e);
        }
    }
    result
}

async fn stream_to_file(
    fetcher: &dyn Fetcher,
    url: &str,
    dest: &Path,
    show_progress: bool,
) -> Result<u64> {
    let FetchBody {
        content_length,
        mut stream,
    } = fetcher.open(url).await?;

    let expected = content_length.unwrap_or(0);
    let pb = (show_progress && expected > PROGRESS_THRESHOLD_BYTES).then(|| {
        let pb = ProgressBar::new(expected);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} [{bar:30.cyan/blue}] {bytes}/{total_bytes}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    });

    let mut file = tokio::fs::File::create(dest).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        if let Some(pb) = &pb {
            pb.set_position(written);
        }
    }
    file.flush().await?;
    drop(file);

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if expected > 0 && written != expected {
        let filename = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Err(ClipscribeError::SizeMismatch {
            filename,
            expected,
            actual: written,
        });
    }

    debug!("Wrote {} bytes", written);
    Ok(written)
}

/// Format a byte count as `B`, `KB`, `MB` or `GB` with one decimal.
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0B".to_string();
    }

    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.1}{}", size, UNITS[unit])
}
