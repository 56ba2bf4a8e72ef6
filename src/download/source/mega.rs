//! Mega downloads through `megatools`.
//!
//! All users share one service account configured for the deployment; the link is handed
//! to `megatools dl` with those credentials and the file lands in the job directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;

use crate::download::error::DownloadError;
use crate::download::source::MegaClient;

pub struct MegatoolsClient {
    bin: String,
    email: String,
    password: SecretString,
    timeout: Duration,
}

impl MegatoolsClient {
    pub fn new(bin: impl Into<String>, email: impl Into<String>, password: &str, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            email: email.into(),
            password: SecretString::from(password.to_string()),
            timeout,
        }
    }

    fn command(&self, url: &str, dest_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("dl").arg("--no-progress");
        if !self.email.is_empty() {
            cmd.arg("--username")
                .arg(&self.email)
                .arg("--password")
                .arg(self.password.expose_secret());
        }
        cmd.arg("--path")
            .arg(dest_dir)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// The single regular file megatools left in `dir`.
fn downloaded_file(dir: &Path) -> Result<PathBuf, DownloadError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }

    match files.len() {
        1 => Ok(files.remove(0)),
        0 => Err(DownloadError::Mega("megatools finished but wrote no file".into())),
        n => Err(DownloadError::Mega(format!(
            "expected one file, megatools wrote {} (folder links are not supported)",
            n
        ))),
    }
}

#[async_trait]
impl MegaClient for MegatoolsClient {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        if self.email.is_empty() {
            return Err(DownloadError::Mega("Mega account is not configured".into()));
        }

        log::info!("📥 Mega download via {}: {}", self.bin, url);

        let output = tokio::time::timeout(self.timeout, self.command(url, dest_dir).output())
            .await
            .map_err(|_| DownloadError::Mega(format!("timed out after {}s", self.timeout.as_secs())))?
            .map_err(|e| DownloadError::Mega(format!("failed to run {}: {}", self.bin, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::Mega(format!(
                "{} exited with {}: {}",
                self.bin,
                output.status,
                stderr.trim()
            )));
        }

        let path = downloaded_file(dest_dir)?;
        log::info!("✅ Mega download complete: {}", path.display());
        Ok(path)
    }
}
