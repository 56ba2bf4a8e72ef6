//! HttpFetcher, the generic fetch. One streamed GET written straight to disk.
//!
//! Features:
//! - Streaming body via reqwest, never buffered in memory
//! - Content-Disposition parsing for the file name, URL path as fallback
//! - File names sanitised to a single path component inside the job directory

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::core::utils::{sanitize_file_name, MIB};
use crate::download::error::DownloadError;
use crate::download::source::Fetcher;

const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; drivelink/", env!("CARGO_PKG_VERSION"), ")");

/// Shared client settings for both fetchers.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, DownloadError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(30))
        .build()?)
}

/// Download source for plain HTTP(S) URLs.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

/// Extract filename from Content-Disposition header or URL path.
pub(crate) fn extract_filename(headers: &HeaderMap, url: &Url) -> String {
    if let Some(name) = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_disposition)
    {
        return sanitize_file_name(&name);
    }

    // Fallback: extract from URL path
    let from_path = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::decode(s).map(|d| d.into_owned()).unwrap_or_else(|_| s.to_string()))
        .unwrap_or_else(|| "download".to_string());

    sanitize_file_name(&from_path)
}

/// Parses `filename*=UTF-8''name` (preferred) or `filename="name"`.
fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;

    for part in value.split(';').map(str::trim) {
        if let Some(encoded) = part.strip_prefix("filename*=") {
            let encoded = encoded.trim_matches('"');
            // charset'lang'percent-encoded
            let raw = encoded.splitn(3, '\'').nth(2).unwrap_or(encoded);
            if let Ok(decoded) = urlencoding::decode(raw) {
                if !decoded.is_empty() {
                    return Some(decoded.into_owned());
                }
            }
        } else if let Some(name) = part.strip_prefix("filename=") {
            let name = name.trim_matches('"');
            if !name.is_empty() {
                plain = Some(name.to_string());
            }
        }
    }

    plain
}

/// Streams a successful response body into `path`, returning the bytes written.
pub(crate) async fn stream_to_file(response: reqwest::Response, path: &Path) -> Result<u64, DownloadError> {
    let total = response.content_length();
    let mut file = tokio::fs::File::create(path).await?;
    let mut downloaded: u64 = 0;
    let mut last_logged_percent = 0u64;

    // Stream response body in chunks
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total.filter(|t| *t > 0) {
            let percent = downloaded * 100 / total;
            if percent >= last_logged_percent + 10 {
                last_logged_percent = percent;
                log::debug!("{}: {}% ({} / {} bytes)", path.display(), percent, downloaded, total);
            }
        }
    }

    file.flush().await?;
    Ok(downloaded)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &Url, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        log::info!("📥 HTTP download: {}", url);

        let response = self.client.get(url.as_str()).send().await?;
        if !response.status().is_success() {
            return Err(DownloadError::Status {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let filename = extract_filename(response.headers(), response.url());
        let path = dest_dir.join(filename);
        let written = stream_to_file(response, &path).await?;

        log::info!(
            "✅ HTTP download complete: {} ({:.2} MB)",
            path.display(),
            written as f64 / MIB as f64
        );

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_filename_from_url_path() {
        let headers = HeaderMap::new();
        assert_eq!(extract_filename(&headers, &url("http://example.com/a.zip")), "a.zip");
        assert_eq!(
            extract_filename(&headers, &url("http://example.com/dir/My%20File.pdf?x=1")),
            "My File.pdf"
        );
        assert_eq!(extract_filename(&headers, &url("http://example.com/")), "download");
    }

    #[test]
    fn test_filename_from_disposition() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static(r#"attachment; filename="report.pdf""#),
        );
        assert_eq!(extract_filename(&headers, &url("http://example.com/dl?id=1")), "report.pdf");
    }

    #[test]
    fn test_filename_star_preferred() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="fallback.txt"; filename*=UTF-8''na%C3%AFve.txt"#),
            Some("naïve.txt".to_string())
        );
    }

    #[test]
    fn test_disposition_cannot_escape_directory() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static(r#"attachment; filename="../../.bashrc""#),
        );
        let name = extract_filename(&headers, &url("http://example.com/x"));
        assert!(!name.contains('/'));
        assert!(!name.starts_with('.'));
    }
}
