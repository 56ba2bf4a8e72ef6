//! Credentials and the upload sink

pub mod credentials;
pub mod oauth;
pub mod upload;

// Re-exports for convenience
pub use credentials::{is_token, AuthError, AuthStatus, CredentialStore, TokenOutcome};
pub use oauth::{Credentials, GoogleOAuth, OAuthClient};
pub use upload::{DriveUploader, UploadContext, UploadError, Uploader};
