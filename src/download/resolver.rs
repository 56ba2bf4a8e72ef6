//! Source resolution: one primary strategy per URL, one optional fallback attempt.
//!
//! The strategy is picked by [`Strategy::for_url`]. When it fails and the fallback is
//! enabled, the workspace is wiped and the segmented fetcher gets exactly one try against
//! the URL as the user sent it. Whatever comes back is validated before it is handed on.

use std::path::Path;
use std::sync::Arc;

use unic_langid::LanguageIdentifier;
use url::Url;

use crate::core::config::Config;
use crate::core::utils::{escape_html, truncate_for_chat};
use crate::download::error::DownloadError;
use crate::download::source::dropbox::direct_download_url;
use crate::download::source::http::HttpFetcher;
use crate::download::source::mega::MegatoolsClient;
use crate::download::source::segmented::SegmentedFetcher;
use crate::download::source::{DownloadedFile, Fetcher, MegaClient, Strategy};
use crate::download::status::{JobState, ProcessingPhase, StatusMessage};
use crate::download::workspace::JobWorkspace;
use crate::i18n;

/// Longest error text put into a status line.
const STATUS_ERROR_CHARS: usize = 300;

pub struct SourceResolver {
    fetcher: Arc<dyn Fetcher>,
    fallback: Arc<dyn Fetcher>,
    mega: Arc<dyn MegaClient>,
    fallback_enabled: bool,
    lang: LanguageIdentifier,
}

impl SourceResolver {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        fallback: Arc<dyn Fetcher>,
        mega: Arc<dyn MegaClient>,
        fallback_enabled: bool,
        lang: LanguageIdentifier,
    ) -> Self {
        Self {
            fetcher,
            fallback,
            mega,
            fallback_enabled,
            lang,
        }
    }

    /// Wires the real backends from configuration.
    pub fn from_config(config: &Config) -> Result<Self, DownloadError> {
        let fetcher = HttpFetcher::new(config.http_timeout())?;
        let fallback = SegmentedFetcher::new(config.http_timeout(), config.fallback_segments)?;
        let mega = MegatoolsClient::new(
            config.megatools_bin.clone(),
            config.mega_email.clone(),
            config.mega_password(),
            config.mega_timeout(),
        );

        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(fallback),
            Arc::new(mega),
            config.fallback_downloader,
            i18n::lang_from_code(&config.language),
        ))
    }

    /// Downloads `raw_url` into `workspace`.
    ///
    /// On success the status message is left in `Downloaded`; on failure it is left in a
    /// processing state and the caller reports the error.
    pub async fn resolve(
        &self,
        raw_url: &str,
        workspace: &JobWorkspace,
        status: &mut StatusMessage,
    ) -> Result<DownloadedFile, DownloadError> {
        let raw_url = raw_url.trim();
        let original = parse_link(raw_url)?;
        let strategy = Strategy::for_url(raw_url);

        let (phase, key) = match strategy {
            Strategy::Dropbox => (ProcessingPhase::DownloadingDropbox, "status-downloading-dropbox"),
            Strategy::Mega => (ProcessingPhase::DownloadingMega, "status-downloading-mega"),
            Strategy::Generic => (ProcessingPhase::Downloading, "status-downloading"),
        };
        status
            .set(JobState::Processing(phase), &i18n::t(&self.lang, key))
            .await;
        log::info!("Resolving {} with the {} strategy", raw_url, strategy.as_str());

        let path = match self.run_primary(strategy, raw_url, &original, workspace.path()).await {
            Ok(path) => path,
            Err(primary) if self.fallback_enabled => {
                log::warn!(
                    "Primary {} download failed [{}]: {}",
                    strategy.as_str(),
                    primary.subcategory(),
                    primary
                );
                self.run_fallback(primary, &original, workspace, status).await?
            }
            Err(primary) => {
                log::warn!("Primary {} download failed, fallback disabled: {}", strategy.as_str(), primary);
                workspace.clear()?;
                return Err(primary);
            }
        };

        let file = match validate_output(&path, workspace) {
            Ok(file) => file,
            Err(e) => {
                workspace.remove_file(&path);
                return Err(e);
            }
        };

        status
            .set(JobState::Downloaded, &i18n::t(&self.lang, "status-downloaded"))
            .await;
        log::info!("Downloaded {} ({} bytes)", file.file_name, file.size_bytes);
        Ok(file)
    }

    async fn run_primary(
        &self,
        strategy: Strategy,
        raw_url: &str,
        original: &Url,
        dest_dir: &Path,
    ) -> Result<std::path::PathBuf, DownloadError> {
        match strategy {
            Strategy::Dropbox => {
                let direct = direct_download_url(raw_url)?;
                log::debug!("Dropbox link rewritten to {}", direct);
                self.fetcher.fetch(&direct, dest_dir).await
            }
            Strategy::Mega => self.mega.download(raw_url, dest_dir).await,
            Strategy::Generic => self.fetcher.fetch(original, dest_dir).await,
        }
    }

    async fn run_fallback(
        &self,
        primary: DownloadError,
        original: &Url,
        workspace: &JobWorkspace,
        status: &mut StatusMessage,
    ) -> Result<std::path::PathBuf, DownloadError> {
        // Partial output of the primary attempt must not be mistaken for the fallback's
        workspace.clear()?;

        let error = escape_html(&truncate_for_chat(&primary.to_string(), STATUS_ERROR_CHARS));
        status
            .set(
                JobState::Processing(ProcessingPhase::Retrying),
                &i18n::t_args(&self.lang, "status-retrying", &[("error", error.as_str())]),
            )
            .await;

        match self.fallback.fetch(original, workspace.path()).await {
            Ok(path) => {
                log::info!("Fallback {} succeeded for {}", self.fallback.name(), original);
                Ok(path)
            }
            Err(fallback) => {
                log::error!("Fallback {} failed for {}: {}", self.fallback.name(), original, fallback);
                workspace.clear()?;
                Err(DownloadError::Fallback {
                    primary: Box::new(primary),
                    fallback: Box::new(fallback),
                })
            }
        }
    }
}

/// Parses the user's link; only http(s) is accepted.
pub fn parse_link(raw: &str) -> Result<Url, DownloadError> {
    let url = Url::parse(raw.trim()).map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DownloadError::InvalidUrl(format!("unsupported scheme {}", other))),
    }
}

/// Checks that a fetcher's output is a non-empty regular file inside the workspace.
fn validate_output(path: &Path, workspace: &JobWorkspace) -> Result<DownloadedFile, DownloadError> {
    if !workspace.contains(path) {
        return Err(DownloadError::InvalidOutput(format!(
            "{} is outside the job directory",
            path.display()
        )));
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| DownloadError::InvalidOutput(format!("{} has no usable file name", path.display())))?
        .to_string();

    let metadata = std::fs::symlink_metadata(path)
        .map_err(|e| DownloadError::InvalidOutput(format!("{}: {}", file_name, e)))?;
    if !metadata.is_file() {
        return Err(DownloadError::InvalidOutput(format!("{} is not a regular file", file_name)));
    }
    if metadata.len() == 0 {
        return Err(DownloadError::InvalidOutput(format!("{} is empty", file_name)));
    }

    Ok(DownloadedFile {
        path: path.to_path_buf(),
        file_name,
        size_bytes: metadata.len(),
    })
}
