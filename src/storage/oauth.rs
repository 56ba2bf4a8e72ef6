//! Google OAuth 2.0 for installed apps.
//!
//! The client only knows the app's id and secret; it never holds a user's tokens. Every
//! call takes the credentials it works on and returns new ones, which the
//! [`CredentialStore`](super::credentials::CredentialStore) persists.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::storage::credentials::AuthError;

pub const GOOGLE_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Tokens are treated as expired this long before Google would reject them.
const EXPIRY_SKEW_SECS: i64 = 60;

/// One user's OAuth tokens, as stored in `credentials/{user}.json`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Credentials {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// The authorization-code flow as the credential store needs it.
#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// URL the user opens to grant access and obtain a code.
    fn authorization_url(&self) -> Result<String, AuthError>;

    async fn exchange_code(&self, code: &str) -> Result<Credentials, AuthError>;

    async fn refresh(&self, credentials: &Credentials) -> Result<Credentials, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_credentials(self, previous_refresh: Option<&str>) -> Credentials {
        Credentials {
            access_token: self.access_token,
            // Refresh responses usually omit the refresh token; keep the old one
            refresh_token: self.refresh_token.or_else(|| previous_refresh.map(str::to_string)),
            expires_at: Utc::now() + ChronoDuration::seconds(self.expires_in),
            scope: self.scope.unwrap_or_else(|| DRIVE_SCOPE.to_string()),
            token_type: self.token_type.unwrap_or_else(default_token_type),
        }
    }
}

pub struct GoogleOAuth {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    auth_endpoint: String,
    token_endpoint: String,
}

impl GoogleOAuth {
    pub fn new(client_id: impl Into<String>, client_secret: &str, redirect_uri: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.to_string()),
            redirect_uri: redirect_uri.into(),
            auth_endpoint: GOOGLE_AUTH_ENDPOINT.to_string(),
            token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
        }
    }

    /// Points the client at other endpoints (a local mock server in tests).
    #[must_use]
    pub fn with_endpoints(mut self, auth_endpoint: impl Into<String>, token_endpoint: impl Into<String>) -> Self {
        self.auth_endpoint = auth_endpoint.into();
        self.token_endpoint = token_endpoint.into();
        self
    }

    fn ensure_configured(&self) -> Result<(), AuthError> {
        if self.client_id.trim().is_empty() || self.client_secret.expose_secret().trim().is_empty() {
            return Err(AuthError::NotConfigured);
        }
        Ok(())
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, String> {
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("{}: {}", status, body.trim()));
        }

        response.json::<TokenResponse>().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl OAuthClient for GoogleOAuth {
    fn authorization_url(&self) -> Result<String, AuthError> {
        self.ensure_configured()?;

        let mut url = Url::parse(&self.auth_endpoint).map_err(|e| AuthError::Exchange(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", DRIVE_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<Credentials, AuthError> {
        self.ensure_configured()?;

        let token = self
            .token_request(&[
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", self.client_secret.expose_secret()),
                ("redirect_uri", &self.redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .await
            .map_err(AuthError::Exchange)?;

        Ok(token.into_credentials(None))
    }

    async fn refresh(&self, credentials: &Credentials) -> Result<Credentials, AuthError> {
        self.ensure_configured()?;

        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::Refresh("no refresh token stored".into()))?;

        let token = self
            .token_request(&[
                ("refresh_token", refresh_token),
                ("client_id", &self.client_id),
                ("client_secret", self.client_secret.expose_secret()),
                ("grant_type", "refresh_token"),
            ])
            .await
            .map_err(AuthError::Refresh)?;

        Ok(token.into_credentials(Some(refresh_token)))
    }
}
