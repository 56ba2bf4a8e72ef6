use thiserror::Error;

/// Structured error type for the download phase of a job.
///
/// `Fallback` is only produced by the resolver after both the primary strategy and the
/// segmented fallback failed; `InvalidOutput` is produced when a fetcher reported success
/// but left nothing usable behind.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The message did not contain a parseable URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure talking to the remote host
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote host answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { status: reqwest::StatusCode, url: String },

    /// Local filesystem failure while writing the download
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// Mega client failed (spawn, exit code, timeout, missing output)
    #[error("mega: {0}")]
    Mega(String),

    /// The fetcher returned, but its output is not a usable file
    #[error("downloaded file rejected: {0}")]
    InvalidOutput(String),

    /// Primary strategy and the fallback downloader both failed
    #[error("{fallback} (after primary failure: {primary})")]
    Fallback {
        primary: Box<DownloadError>,
        fallback: Box<DownloadError>,
    },
}

impl DownloadError {
    /// Returns subcategory for logs
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::InvalidUrl(_) => "invalid_url",
            DownloadError::Http(_) => "http",
            DownloadError::Status { .. } => "status",
            DownloadError::Io(_) => "io",
            DownloadError::Mega(_) => "mega",
            DownloadError::InvalidOutput(_) => "invalid_output",
            DownloadError::Fallback { .. } => "fallback",
        }
    }

    /// Whether the error came out of the fallback downloader.
    pub fn is_fallback(&self) -> bool {
        matches!(self, DownloadError::Fallback { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_display() {
        let err = DownloadError::Mega("megatools exited with 1".into());
        assert_eq!(err.to_string(), "mega: megatools exited with 1");
    }

    #[test]
    fn test_fallback_display_mentions_both() {
        let err = DownloadError::Fallback {
            primary: Box::new(DownloadError::InvalidOutput("empty file".into())),
            fallback: Box::new(DownloadError::Mega("boom".into())),
        };
        let text = err.to_string();
        assert!(text.contains("boom"));
        assert!(text.contains("empty file"));
        assert!(err.is_fallback());
        assert_eq!(err.subcategory(), "fallback");
    }
}
