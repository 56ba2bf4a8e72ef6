use thiserror::Error;

use crate::download::error::DownloadError;
use crate::storage::credentials::AuthError;
use crate::storage::upload::UploadError;

/// Centralized error types for the application
///
/// Every layer has its own error enum; they all convert into this one so handlers can use
/// `?` and report a single type at the dispatcher boundary.
#[derive(Error, Debug)]
pub enum AppError {
    /// Credential store / OAuth errors
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Source resolver errors
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Upload sink errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::Config(Box::new(err))
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_errors_keep_their_message() {
        let err: AppError = DownloadError::InvalidUrl("not a url".into()).into();
        assert_eq!(err.to_string(), "Download error: invalid URL: not a url");

        let err: AppError = AuthError::NotAuthorized.into();
        assert!(err.to_string().starts_with("Auth error:"));
    }
}
