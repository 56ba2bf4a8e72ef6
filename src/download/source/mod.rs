//! Download backends and URL routing.
//!
//! Routing is a plain substring test on the raw URL, first match wins:
//! - `dropbox.com`: rewrite the share link to a direct download, then generic fetch
//! - `mega.nz`: credentialed download through the shared Mega account
//! - anything else: generic fetch
//!
//! Backends:
//! - `HttpFetcher`: streamed GET, the generic fetch
//! - `SegmentedFetcher`: parallel ranged GETs, used only as the fallback
//! - `MegatoolsClient`: `megatools dl` subprocess

pub mod dropbox;
pub mod http;
pub mod mega;
pub mod segmented;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use url::Url;

use crate::core::utils::size_in_mib;
use crate::download::error::DownloadError;

pub const DROPBOX_MARKER: &str = "dropbox.com";
pub const MEGA_MARKER: &str = "mega.nz";

/// Fetches a URL into a directory and returns the path of the file it wrote.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Human-readable name of this fetcher (e.g., "http", "segmented")
    fn name(&self) -> &str;

    async fn fetch(&self, url: &Url, dest_dir: &Path) -> Result<PathBuf, DownloadError>;
}

/// Downloads Mega links with the deployment's shared account.
#[async_trait]
pub trait MegaClient: Send + Sync {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, DownloadError>;
}

/// Primary download strategy for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Dropbox,
    Mega,
    Generic,
}

impl Strategy {
    pub fn for_url(url: &str) -> Self {
        if url.contains(DROPBOX_MARKER) {
            Strategy::Dropbox
        } else if url.contains(MEGA_MARKER) {
            Strategy::Mega
        } else {
            Strategy::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Dropbox => "dropbox",
            Strategy::Mega => "mega",
            Strategy::Generic => "generic",
        }
    }
}

/// A validated download, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

impl DownloadedFile {
    pub fn size_mib(&self) -> u64 {
        size_in_mib(self.size_bytes)
    }
}
