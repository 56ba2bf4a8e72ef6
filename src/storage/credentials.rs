//! Per-user OAuth credential files.
//!
//! Layout: `{credentials_dir}/{user}.json`, one JSON [`Credentials`] per user. Nothing is
//! cached in memory: each operation reads the user's file, works on that copy and writes
//! it back if it changed.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lazy_regex::regex_is_match;
use thiserror::Error;

use crate::core::types::UserKey;
use crate::storage::oauth::{Credentials, OAuthClient};
use crate::storage::upload::UploadContext;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Credential file is unreadable or corrupt; the user has to authorize again
    #[error("cannot load credentials from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("token refresh failed: {0}")]
    Refresh(String),

    #[error("not authorized")]
    NotAuthorized,

    #[error("Google OAuth client is not configured")]
    NotConfigured,

    #[error("credential file error: {0}")]
    Io(#[from] io::Error),
}

/// Result of `/auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    NeedsAuthorization(String),
    Refreshed,
    AlreadyAuthorized,
}

/// Result of feeding a free-text message to the token handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOutcome {
    NotAToken,
    Authorized,
}

/// Whether the last word of `text` looks like a Google authorization code.
///
/// # Example
///
/// ```
/// use drivelink::storage::credentials::is_token;
///
/// assert!(is_token("4/0AX4XfWh_abcdefghijk"));
/// assert!(!is_token("hello there"));
/// ```
pub fn is_token(text: &str) -> bool {
    text.split_whitespace()
        .next_back()
        .is_some_and(|word| regex_is_match!(r"^4/[0-9A-Za-z_-]{10,}$", word))
}

pub struct CredentialStore {
    dir: PathBuf,
    oauth: Arc<dyn OAuthClient>,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>, oauth: Arc<dyn OAuthClient>) -> Self {
        Self { dir: dir.into(), oauth }
    }

    pub fn path_for(&self, user: UserKey) -> PathBuf {
        self.dir.join(format!("{}.json", user))
    }

    pub async fn exists(&self, user: UserKey) -> bool {
        tokio::fs::try_exists(self.path_for(user)).await.unwrap_or(false)
    }

    /// Reads the user's credentials. A missing file is `NotAuthorized`.
    pub async fn load(&self, user: UserKey) -> Result<Credentials, AuthError> {
        let path = self.path_for(user);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(AuthError::NotAuthorized),
            Err(e) => {
                return Err(AuthError::Load {
                    path,
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| AuthError::Load {
            path,
            reason: e.to_string(),
        })
    }

    /// Replaces the user's credential file atomically.
    pub async fn save(&self, user: UserKey, credentials: &Credentials) -> Result<(), AuthError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(user);
        let tmp = self.dir.join(format!(".{}.json.{}.tmp", user, uuid::Uuid::new_v4().simple()));
        let json = serde_json::to_vec_pretty(credentials).map_err(io::Error::other)?;

        if let Err(e) = write_private(&tmp, &json).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        log::debug!("Saved credentials for user {}", user);
        Ok(())
    }

    pub async fn delete(&self, user: UserKey) -> Result<(), AuthError> {
        match tokio::fs::remove_file(self.path_for(user)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(AuthError::NotAuthorized),
            Err(e) => Err(e.into()),
        }
    }

    /// Handles `/auth`.
    pub async fn authorize(&self, user: UserKey) -> Result<AuthStatus, AuthError> {
        let credentials = match self.load(user).await {
            Ok(credentials) => credentials,
            Err(AuthError::NotAuthorized) => return self.needs_authorization(),
            Err(e @ AuthError::Load { .. }) => {
                log::warn!("User {}: {}", user, e);
                return self.needs_authorization();
            }
            Err(e) => return Err(e),
        };

        if !credentials.is_expired() {
            return Ok(AuthStatus::AlreadyAuthorized);
        }

        match self.oauth.refresh(&credentials).await {
            Ok(fresh) => {
                self.save(user, &fresh).await?;
                log::info!("Refreshed credentials for user {}", user);
                Ok(AuthStatus::Refreshed)
            }
            Err(e) => {
                log::warn!("User {}: {}, asking to authorize again", user, e);
                self.needs_authorization()
            }
        }
    }

    fn needs_authorization(&self) -> Result<AuthStatus, AuthError> {
        Ok(AuthStatus::NeedsAuthorization(self.oauth.authorization_url()?))
    }

    /// Handles a free-text message that may carry an authorization code.
    pub async fn submit_token(&self, user: UserKey, text: &str) -> Result<TokenOutcome, AuthError> {
        if !is_token(text) {
            log::debug!("User {} sent text that is not an authorization code", user);
            return Ok(TokenOutcome::NotAToken);
        }

        let code = text.split_whitespace().next_back().unwrap_or_default();
        let credentials = self.oauth.exchange_code(code).await?;
        self.save(user, &credentials).await?;

        log::info!("User {} authorized", user);
        Ok(TokenOutcome::Authorized)
    }

    /// Handles `/revoke`. Only the local file is removed.
    pub async fn revoke(&self, user: UserKey) -> Result<(), AuthError> {
        self.delete(user).await?;
        log::info!("Credentials of user {} deleted", user);
        Ok(())
    }

    /// Fresh credentials for one upload, refreshed and persisted when expired.
    pub async fn context_for_upload(&self, user: UserKey) -> Result<UploadContext, AuthError> {
        let mut credentials = self.load(user).await?;

        if credentials.is_expired() {
            credentials = self.oauth.refresh(&credentials).await?;
            self.save(user, &credentials).await?;
            log::info!("Refreshed credentials for user {} before upload", user);
        }

        Ok(UploadContext { user, credentials })
    }
}

async fn write_private(path: &Path, data: &[u8]) -> io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}
