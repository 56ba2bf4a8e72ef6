//! Runtime configuration
//!
//! Loaded once at startup from (lowest to highest priority) built-in defaults, an optional
//! TOML file and `DRIVELINK_*` environment variables, then shared read-only behind an
//! `Arc`. Secrets stay wrapped in [`SecretString`] so they never end up in `Debug` output.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::core::error::{AppError, AppResult};

/// Config file read when `--config` is not given. Missing file is not an error.
pub const DEFAULT_CONFIG_FILE: &str = "drivelink.toml";

/// Prefix for environment overrides (`DRIVELINK_BOT_TOKEN`, `DRIVELINK_WORKERS`, ...)
pub const ENV_PREFIX: &str = "DRIVELINK_";

/// Google's out-of-band redirect: the user copies the code back into the chat.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default, deserialize_with = "opt_secret")]
    bot_token: Option<SecretString>,

    /// Custom Bot API server (local telegram-bot-api)
    #[serde(default)]
    pub bot_api_url: Option<String>,

    #[serde(default)]
    pub google_client_id: String,

    #[serde(default, deserialize_with = "opt_secret")]
    google_client_secret: Option<SecretString>,

    #[serde(default = "default_redirect_uri")]
    pub oauth_redirect_uri: String,

    /// Drive folder every upload lands in
    #[serde(default = "default_drive_folder")]
    pub drive_folder_name: String,

    /// One `{user_id}.json` per authorized user
    #[serde(default = "default_credentials_dir")]
    pub credentials_dir: PathBuf,

    /// Parent of the per-job workspaces
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Retry failed downloads once with the segmented downloader
    #[serde(default = "default_true")]
    pub fallback_downloader: bool,

    #[serde(default = "default_segments")]
    pub fallback_segments: usize,

    /// Maximum number of jobs running at once
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub mega_email: String,

    #[serde(default, deserialize_with = "opt_secret")]
    mega_password: Option<SecretString>,

    #[serde(default = "default_megatools_bin")]
    pub megatools_bin: String,

    #[serde(default = "default_transfer_timeout")]
    pub mega_timeout_secs: u64,

    #[serde(default = "default_transfer_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_log_file")]
    pub log_file_path: String,

    /// Language of bot replies (`en`, `ru`)
    #[serde(default = "default_language")]
    pub language: String,
}

fn opt_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()).map(SecretString::from))
}

fn default_redirect_uri() -> String {
    OOB_REDIRECT_URI.to_string()
}

fn default_drive_folder() -> String {
    "drivelink".to_string()
}

fn default_credentials_dir() -> PathBuf {
    PathBuf::from("credentials")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_true() -> bool {
    true
}

fn default_segments() -> usize {
    4
}

fn default_workers() -> usize {
    8
}

fn default_megatools_bin() -> String {
    "megatools".to_string()
}

fn default_transfer_timeout() -> u64 {
    3600
}

fn default_log_file() -> String {
    "drivelink.log".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

impl Config {
    /// Loads the configuration from `path` (or [`DEFAULT_CONFIG_FILE`]) and the environment.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX));
        Self::from_figment(figment)
    }

    /// Extracts and validates a configuration from an already assembled figment.
    pub fn from_figment(figment: Figment) -> AppResult<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the bot cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.workers == 0 {
            return Err(AppError::Validation("workers must be at least 1".into()));
        }
        if self.fallback_segments == 0 {
            return Err(AppError::Validation("fallback_segments must be at least 1".into()));
        }
        if self.drive_folder_name.trim().is_empty() {
            return Err(AppError::Validation("drive_folder_name must not be empty".into()));
        }
        Ok(())
    }

    /// Bot token; an error when it is not configured.
    pub fn bot_token(&self) -> AppResult<&str> {
        self.bot_token
            .as_ref()
            .map(|s| s.expose_secret())
            .ok_or_else(|| AppError::Validation(format!("{}BOT_TOKEN is not set", ENV_PREFIX)))
    }

    pub fn google_client_secret(&self) -> &str {
        self.google_client_secret
            .as_ref()
            .map(|s| s.expose_secret())
            .unwrap_or_default()
    }

    pub fn mega_password(&self) -> &str {
        self.mega_password
            .as_ref()
            .map(|s| s.expose_secret())
            .unwrap_or_default()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn mega_timeout(&self) -> Duration {
        Duration::from_secs(self.mega_timeout_secs)
    }
}
