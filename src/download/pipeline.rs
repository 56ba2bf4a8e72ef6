//! Download-then-upload orchestration for one job.
//!
//! A job owns its status message and its workspace directory. Whatever happens, it ends
//! with exactly one terminal status edit (`Done` or `Error`) and with the workspace
//! removed from disk.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use unic_langid::LanguageIdentifier;

use crate::core::config::Config;
use crate::core::types::UserKey;
use crate::core::utils::{escape_html, truncate_for_chat};
use crate::download::error::DownloadError;
use crate::download::resolver::SourceResolver;
use crate::download::status::{JobState, StatusMessage};
use crate::download::workspace::JobWorkspace;
use crate::i18n;
use crate::storage::credentials::CredentialStore;
use crate::storage::upload::{DriveUploader, UploadError, Uploader};

const STATUS_ERROR_CHARS: usize = 500;

/// One user request.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub user: UserKey,
    pub url: String,
}

impl Job {
    pub fn new(user: UserKey, url: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            user,
            url: url.into(),
        }
    }
}

/// Where a failed job stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Download,
    Upload,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Setup => "setup",
            Phase::Download => "download",
            Phase::Upload => "upload",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Done {
        file_name: String,
        size_mib: u64,
        link: String,
    },
    Failed {
        phase: Phase,
        error: String,
    },
}

pub struct Pipeline {
    resolver: SourceResolver,
    uploader: Arc<dyn Uploader>,
    credentials: Arc<CredentialStore>,
    download_dir: PathBuf,
    folder_name: String,
    lang: LanguageIdentifier,
}

impl Pipeline {
    pub fn new(
        resolver: SourceResolver,
        uploader: Arc<dyn Uploader>,
        credentials: Arc<CredentialStore>,
        download_dir: impl Into<PathBuf>,
        folder_name: impl Into<String>,
        lang: LanguageIdentifier,
    ) -> Self {
        Self {
            resolver,
            uploader,
            credentials,
            download_dir: download_dir.into(),
            folder_name: folder_name.into(),
            lang,
        }
    }

    pub fn from_config(config: &Config, credentials: Arc<CredentialStore>) -> Result<Self, crate::core::error::AppError> {
        let resolver = SourceResolver::from_config(config)?;
        let uploader = DriveUploader::new(config.http_timeout())?;

        Ok(Self::new(
            resolver,
            Arc::new(uploader),
            credentials,
            config.download_dir.clone(),
            config.drive_folder_name.clone(),
            i18n::lang_from_code(&config.language),
        ))
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Runs `job` to a terminal state, reporting progress through `status`.
    pub async fn run(&self, job: &Job, status: &mut StatusMessage) -> JobOutcome {
        log::info!("Job {} for user {} started: {}", job.id, job.user, job.url);

        let workspace = match JobWorkspace::create(&self.download_dir, &job.id) {
            Ok(workspace) => workspace,
            Err(e) => {
                log::error!("Job {}: cannot create workspace: {}", job.id, e);
                return self.fail(status, Phase::Setup, "status-internal-error", &e.to_string()).await;
            }
        };

        let outcome = self.run_in(job, &workspace, status).await;
        workspace.close();

        match &outcome {
            JobOutcome::Done { file_name, link, .. } => {
                log::info!("Job {} done: {} -> {}", job.id, file_name, link)
            }
            JobOutcome::Failed { phase, error } => log::warn!("Job {} failed during {}: {}", job.id, phase, error),
        }
        outcome
    }

    async fn run_in(&self, job: &Job, workspace: &JobWorkspace, status: &mut StatusMessage) -> JobOutcome {
        let file = match self.resolver.resolve(&job.url, workspace, status).await {
            Ok(file) => file,
            Err(e) => {
                let key = download_error_key(&e);
                return self.fail(status, Phase::Download, key, &e.to_string()).await;
            }
        };

        status
            .set(JobState::Uploading, &i18n::t(&self.lang, "status-uploading"))
            .await;

        let uploaded: Result<String, UploadError> = async {
            let ctx = self.credentials.context_for_upload(job.user).await?;
            self.uploader.upload(&file, &ctx, &self.folder_name).await
        }
        .await;
        workspace.remove_file(&file.path);

        match uploaded {
            Ok(link) => {
                let size_mib = file.size_mib();
                let name = escape_html(&file.file_name);
                let size = size_mib.to_string();
                let href = escape_html(&link);
                let text = i18n::t_args(
                    &self.lang,
                    "status-done",
                    &[("name", name.as_str()), ("size", size.as_str()), ("link", href.as_str())],
                );
                status.set(JobState::Done, &text).await;
                JobOutcome::Done {
                    file_name: file.file_name,
                    size_mib,
                    link,
                }
            }
            Err(e) => self.fail(status, Phase::Upload, "status-upload-failed", &e.to_string()).await,
        }
    }

    async fn fail(&self, status: &mut StatusMessage, phase: Phase, key: &str, error: &str) -> JobOutcome {
        let shown = escape_html(&truncate_for_chat(error, STATUS_ERROR_CHARS));
        let text = i18n::t_args(&self.lang, key, &[("error", shown.as_str())]);
        status.set(JobState::Error, &text).await;
        JobOutcome::Failed {
            phase,
            error: error.to_string(),
        }
    }
}

fn download_error_key(error: &DownloadError) -> &'static str {
    match error {
        DownloadError::InvalidUrl(_) => "status-invalid-url",
        DownloadError::InvalidOutput(_) => "status-invalid-file",
        DownloadError::Fallback { .. } => "status-fallback-failed",
        _ => "status-download-failed",
    }
}
