//! SegmentedFetcher: the fallback downloader.
//!
//! Probes the URL with HEAD; when the server accepts byte ranges and the file is large
//! enough, the body is fetched as N concurrent ranged GETs written into a pre-sized file,
//! with one shared byte counter for progress. Anything else degrades to a single
//! streamed GET so the fallback still gets its one attempt.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use reqwest::{Client, StatusCode};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use url::Url;

use crate::core::utils::MIB;
use crate::download::error::DownloadError;
use crate::download::source::http::{build_client, extract_filename, stream_to_file};
use crate::download::source::Fetcher;

/// Files smaller than `segments * MIN_SEGMENT_BYTES` are fetched in one piece.
pub const MIN_SEGMENT_BYTES: u64 = MIB;

pub struct SegmentedFetcher {
    client: Client,
    segments: usize,
    min_segment_bytes: u64,
}

impl SegmentedFetcher {
    pub fn new(timeout: Duration, segments: usize) -> Result<Self, DownloadError> {
        Ok(Self {
            client: build_client(timeout)?,
            segments: segments.max(1),
            min_segment_bytes: MIN_SEGMENT_BYTES,
        })
    }

    /// Lowers the size threshold for splitting; test servers serve tiny bodies.
    #[must_use]
    pub fn with_min_segment_bytes(mut self, bytes: u64) -> Self {
        self.min_segment_bytes = bytes.max(1);
        self
    }

    async fn fetch_single(&self, url: &Url, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        let response = self.client.get(url.as_str()).send().await?;
        if !response.status().is_success() {
            return Err(DownloadError::Status {
                status: response.status(),
                url: url.to_string(),
            });
        }
        let path = dest_dir.join(extract_filename(response.headers(), response.url()));
        stream_to_file(response, &path).await?;
        Ok(path)
    }

    async fn fetch_range(
        &self,
        url: &Url,
        path: &Path,
        (start, end): (u64, u64),
        progress: Arc<AtomicU64>,
        total: u64,
    ) -> Result<(), DownloadError> {
        let response = self
            .client
            .get(url.as_str())
            .header(RANGE, format!("bytes={}-{}", start, end))
            .send()
            .await?;

        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(DownloadError::Status {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let mut file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
        file.seek(SeekFrom::Start(start)).await?;

        let expected = end - start + 1;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if written + chunk.len() as u64 > expected {
                return Err(DownloadError::InvalidOutput(format!(
                    "segment {}-{} returned more than {} bytes",
                    start, end, expected
                )));
            }
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;

            let done = progress.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
            log::debug!("segmented {}: {} / {} bytes", path.display(), done, total);
        }
        file.flush().await?;

        if written != expected {
            return Err(DownloadError::InvalidOutput(format!(
                "segment {}-{} ended after {} of {} bytes",
                start, end, written, expected
            )));
        }
        Ok(())
    }
}

/// Splits `0..total` into at most `segments` inclusive byte ranges of near-equal size.
pub fn split_ranges(total: u64, segments: usize) -> Vec<(u64, u64)> {
    if total == 0 {
        return Vec::new();
    }
    let segments = (segments.max(1) as u64).min(total);
    let base = total / segments;
    let extra = total % segments;

    let mut ranges = Vec::with_capacity(segments as usize);
    let mut start = 0;
    for i in 0..segments {
        let len = base + u64::from(i < extra);
        ranges.push((start, start + len - 1));
        start += len;
    }
    ranges
}

#[async_trait]
impl Fetcher for SegmentedFetcher {
    fn name(&self) -> &str {
        "segmented"
    }

    async fn fetch(&self, url: &Url, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        log::info!("🔁 Segmented download ({} segments): {}", self.segments, url);

        let head = match self.client.head(url.as_str()).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                log::info!("HEAD {} returned {}, using a single stream", url, r.status());
                return self.fetch_single(url, dest_dir).await;
            }
            Err(e) => {
                log::info!("HEAD {} failed ({}), using a single stream", url, e);
                return self.fetch_single(url, dest_dir).await;
            }
        };

        let accepts_ranges = head
            .headers()
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("bytes"));
        // HEAD has no body, so read the header rather than the body size hint
        let total = head
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        if self.segments < 2 || !accepts_ranges || total < self.segments as u64 * self.min_segment_bytes {
            return self.fetch_single(url, dest_dir).await;
        }

        let path = dest_dir.join(extract_filename(head.headers(), head.url()));
        let file = tokio::fs::File::create(&path).await?;
        file.set_len(total).await?;
        drop(file);

        let progress = Arc::new(AtomicU64::new(0));
        let ranges = split_ranges(total, self.segments);
        try_join_all(
            ranges
                .into_iter()
                .map(|range| self.fetch_range(url, &path, range, Arc::clone(&progress), total)),
        )
        .await?;

        let done = progress.load(Ordering::Relaxed);
        if done != total {
            return Err(DownloadError::InvalidOutput(format!(
                "segmented download wrote {} of {} bytes",
                done, total
            )));
        }

        log::info!(
            "✅ Segmented download complete: {} ({:.2} MB)",
            path.display(),
            total as f64 / MIB as f64
        );
        Ok(path)
    }
}
