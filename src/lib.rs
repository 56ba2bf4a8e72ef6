//! drivelink - Telegram bot that mirrors files from links into Google Drive
//!
//! A user sends a link; the bot downloads it (plain HTTP, Dropbox or Mega, with one
//! segmented retry), uploads the file to the user's own Drive and answers with a share
//! link. Each user's OAuth credentials live in their own file.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, worker pool and small helpers
//! - `download`: source resolution, fetchers, status message and the job pipeline
//! - `storage`: OAuth credentials and the Drive upload sink
//! - `telegram`: bot setup, routing and handlers

pub mod cli;
pub mod core;
pub mod download;
pub mod i18n;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult, Config};
pub use download::{Job, JobOutcome, Pipeline, SourceResolver};
pub use storage::{CredentialStore, GoogleOAuth};
