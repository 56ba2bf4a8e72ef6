//! Google Drive upload.
//!
//! Drive v3 REST calls made with the user's access token:
//! 1. find the target folder by name, creating it when missing
//! 2. resumable upload: open a session, then stream the file body into it
//! 3. grant `anyone:reader` so the link works without signing in
//! 4. hand back `webContentLink`, or `webViewLink`, or a plain `open?id=` link

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio_util::io::ReaderStream;

use crate::core::types::UserKey;
use crate::download::source::DownloadedFile;
use crate::storage::credentials::AuthError;
use crate::storage::oauth::Credentials;

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("authorization: {0}")]
    Auth(#[from] AuthError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Drive API returned {status} while {stage}: {body}")]
    Status {
        stage: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("file error: {0}")]
    Io(#[from] io::Error),

    #[error("Drive response is missing {0}")]
    MissingField(&'static str),
}

/// Everything an upload needs to act as one user; built per job and dropped after.
#[derive(Debug, Clone)]
pub struct UploadContext {
    pub user: UserKey,
    pub credentials: Credentials,
}

#[async_trait]
pub trait Uploader: Send + Sync {
    /// Uploads `file` into `folder` of the user's storage and returns a shareable link.
    async fn upload(&self, file: &DownloadedFile, ctx: &UploadContext, folder: &str) -> Result<String, UploadError>;
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: Option<String>,
    web_content_link: Option<String>,
    web_view_link: Option<String>,
}

impl DriveFile {
    fn into_link(self) -> Result<String, UploadError> {
        if let Some(link) = self.web_content_link.filter(|l| !l.is_empty()) {
            return Ok(link);
        }
        if let Some(link) = self.web_view_link.filter(|l| !l.is_empty()) {
            return Ok(link);
        }
        let id = self.id.ok_or(UploadError::MissingField("id"))?;
        Ok(format!("https://drive.google.com/open?id={}", id))
    }
}

pub struct DriveUploader {
    client: Client,
    api_base: String,
}

impl DriveUploader {
    pub fn new(timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_base: DRIVE_API_BASE.to_string(),
        })
    }

    /// Sends every request to `api_base` instead of Google (a local mock server in tests).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn ensure_folder(&self, token: &str, name: &str) -> Result<String, UploadError> {
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            escape_query(name),
            FOLDER_MIME
        );
        let response = self
            .client
            .get(format!("{}/drive/v3/files", self.api_base))
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)"), ("spaces", "drive")])
            .send()
            .await?;
        let list: FileList = check(response, "looking up the folder").await?.json().await?;

        if let Some(id) = list.files.into_iter().find_map(|f| f.id) {
            return Ok(id);
        }

        log::info!("Creating Drive folder '{}'", name);
        let response = self
            .client
            .post(format!("{}/drive/v3/files", self.api_base))
            .bearer_auth(token)
            .query(&[("fields", "id")])
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME }))
            .send()
            .await?;
        let folder: DriveFile = check(response, "creating the folder").await?.json().await?;
        folder.id.ok_or(UploadError::MissingField("id"))
    }

    async fn upload_file(&self, token: &str, file: &DownloadedFile, folder_id: &str) -> Result<DriveFile, UploadError> {
        let response = self
            .client
            .post(format!("{}/upload/drive/v3/files", self.api_base))
            .bearer_auth(token)
            .query(&[("uploadType", "resumable"), ("fields", "id,webContentLink,webViewLink")])
            .header("X-Upload-Content-Type", "application/octet-stream")
            .header("X-Upload-Content-Length", file.size_bytes)
            .json(&json!({ "name": file.file_name, "parents": [folder_id] }))
            .send()
            .await?;
        let response = check(response, "starting the upload").await?;

        let session = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(UploadError::MissingField("upload session location"))?
            .to_string();

        let body = tokio::fs::File::open(&file.path).await?;
        let response = self
            .client
            .put(session)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, file.size_bytes)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(body)))
            .send()
            .await?;

        Ok(check(response, "uploading the file").await?.json().await?)
    }

    async fn share(&self, token: &str, file_id: &str) -> Result<(), UploadError> {
        let response = self
            .client
            .post(format!("{}/drive/v3/files/{}/permissions", self.api_base, file_id))
            .bearer_auth(token)
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?;
        check(response, "sharing the file").await?;
        Ok(())
    }
}

#[async_trait]
impl Uploader for DriveUploader {
    async fn upload(&self, file: &DownloadedFile, ctx: &UploadContext, folder: &str) -> Result<String, UploadError> {
        let token = ctx.credentials.access_token.as_str();
        log::info!(
            "📤 Uploading {} ({} bytes) for user {} into '{}'",
            file.file_name,
            file.size_bytes,
            ctx.user,
            folder
        );

        let folder_id = self.ensure_folder(token, folder).await?;
        let uploaded = self.upload_file(token, file, &folder_id).await?;
        let file_id = uploaded.id.clone().ok_or(UploadError::MissingField("id"))?;
        self.share(token, &file_id).await?;

        let link = uploaded.into_link()?;
        log::info!("✅ Uploaded {} as {}", file.file_name, file_id);
        Ok(link)
    }
}

async fn check(response: reqwest::Response, stage: &'static str) -> Result<reqwest::Response, UploadError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UploadError::Status {
        stage,
        status,
        body: body.trim().to_string(),
    })
}

/// Escapes a value for a single-quoted Drive query string.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
