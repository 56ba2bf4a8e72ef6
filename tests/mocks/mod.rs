//! Fakes for the pipeline's collaborators
//!
//! Every fake records how it was called so tests can assert on routing (which backend
//! ran, with which URL) without any network access.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use url::Url;

use drivelink::core::AppError;
use drivelink::download::source::{DownloadedFile, Fetcher, MegaClient};
use drivelink::download::{DownloadError, StatusSink};
use drivelink::storage::{AuthError, Credentials, OAuthClient, UploadContext, UploadError, Uploader};

/// What a fake downloader does when called.
#[derive(Debug, Clone)]
pub enum FetchBehavior {
    /// Writes `name` with `bytes` into the destination directory
    Write { name: String, bytes: Vec<u8> },
    /// Writes a partial file, then fails
    PartialThenFail,
    /// Reports success but leaves an empty file
    WriteEmpty(String),
    Fail(String),
}

impl FetchBehavior {
    pub fn write(name: &str, bytes: &[u8]) -> Self {
        FetchBehavior::Write {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    fn run(&self, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        match self {
            FetchBehavior::Write { name, bytes } => {
                let path = dest_dir.join(name);
                std::fs::write(&path, bytes)?;
                Ok(path)
            }
            FetchBehavior::PartialThenFail => {
                std::fs::write(dest_dir.join("partial.part"), b"half")?;
                Err(DownloadError::Mega("connection reset".into()))
            }
            FetchBehavior::WriteEmpty(name) => {
                let path = dest_dir.join(name);
                std::fs::write(&path, b"")?;
                Ok(path)
            }
            FetchBehavior::Fail(reason) => Err(DownloadError::InvalidUrl(reason.clone())),
        }
    }
}

pub struct FakeFetcher {
    name: &'static str,
    behavior: FetchBehavior,
    pub calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new(name: &'static str, behavior: FetchBehavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, url: &Url, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.behavior.run(dest_dir)
    }
}

pub struct FakeMega {
    behavior: FetchBehavior,
    pub calls: Mutex<Vec<String>>,
}

impl FakeMega {
    pub fn new(behavior: FetchBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MegaClient for FakeMega {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.behavior.run(dest_dir)
    }
}

/// One recorded upload.
#[derive(Debug, Clone)]
pub struct UploadCall {
    pub file_name: String,
    pub size_bytes: u64,
    pub folder: String,
    pub access_token: String,
    pub existed: bool,
}

pub struct FakeUploader {
    fail: bool,
    pub calls: Mutex<Vec<UploadCall>>,
}

impl FakeUploader {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<UploadCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Uploader for FakeUploader {
    async fn upload(&self, file: &DownloadedFile, ctx: &UploadContext, folder: &str) -> Result<String, UploadError> {
        self.calls.lock().unwrap().push(UploadCall {
            file_name: file.file_name.clone(),
            size_bytes: file.size_bytes,
            folder: folder.to_string(),
            access_token: ctx.credentials.access_token.clone(),
            existed: file.path.is_file(),
        });
        if self.fail {
            return Err(UploadError::MissingField("id"));
        }
        Ok(format!("https://drive.example/{}", file.file_name))
    }
}

/// OAuth client that hands out predictable tokens.
pub struct FakeOAuth {
    pub fail_exchange: bool,
    pub fail_refresh: bool,
    pub exchanges: Mutex<Vec<String>>,
    pub refreshes: AtomicUsize,
}

impl FakeOAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_exchange: false,
            fail_refresh: false,
            exchanges: Mutex::new(Vec::new()),
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_exchange: true,
            fail_refresh: true,
            exchanges: Mutex::new(Vec::new()),
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

pub const AUTH_URL: &str = "https://accounts.example/auth?client_id=test";

#[async_trait]
impl OAuthClient for FakeOAuth {
    fn authorization_url(&self) -> Result<String, AuthError> {
        Ok(AUTH_URL.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<Credentials, AuthError> {
        self.exchanges.lock().unwrap().push(code.to_string());
        if self.fail_exchange {
            return Err(AuthError::Exchange("invalid_grant".into()));
        }
        Ok(credentials_expiring_in(3600, "exchanged"))
    }

    async fn refresh(&self, _credentials: &Credentials) -> Result<Credentials, AuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh {
            return Err(AuthError::Refresh("invalid_grant".into()));
        }
        Ok(credentials_expiring_in(3600, "refreshed"))
    }
}

pub fn credentials_expiring_in(secs: i64, access_token: &str) -> Credentials {
    Credentials {
        access_token: access_token.to_string(),
        refresh_token: Some("1//refresh".to_string()),
        expires_at: Utc::now() + Duration::seconds(secs),
        scope: "https://www.googleapis.com/auth/drive.file".to_string(),
        token_type: "Bearer".to_string(),
    }
}

/// Status sink that keeps every text it was asked to show.
#[derive(Default)]
pub struct RecordingSink {
    pub texts: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn edit(&self, text: &str) -> Result<(), AppError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
