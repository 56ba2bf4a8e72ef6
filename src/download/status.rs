//! Status message state machine.
//!
//! Each job owns exactly one chat message; every state change is an in-place edit of it.
//! The transport behind the edit is a [`StatusSink`] so the pipeline can run against a
//! recording fake in tests.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::error::AppError;

/// Which downloader is currently working on the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingPhase {
    Downloading,
    DownloadingDropbox,
    DownloadingMega,
    /// Primary strategy failed, segmented fallback running
    Retrying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Processing(ProcessingPhase),
    Downloaded,
    Uploading,
    Done,
    Error,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Error)
    }

    /// Allowed edges of the lifecycle.
    ///
    /// `Error` is reachable from every non-terminal state, terminal states have no exits,
    /// and `Downloaded` can only be entered from `Processing`.
    pub fn can_transition_to(&self, next: &JobState) -> bool {
        use JobState::*;
        use ProcessingPhase::Retrying;

        match (self, next) {
            (Done | Error, _) => false,
            (_, Error) => true,
            (Queued, Processing(_)) => true,
            (Processing(from), Processing(Retrying)) => *from != Retrying,
            (Processing(_), Downloaded) => true,
            (Downloaded, Uploading) => true,
            (Uploading, Done) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("invalid status transition {from:?} -> {to:?}")]
    InvalidTransition { from: JobState, to: JobState },
}

/// Where status text goes. The Telegram implementation edits the job's message.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn edit(&self, text: &str) -> Result<(), AppError>;
}

/// Writes status lines to the log; used when there is no chat to edit (CLI fetch).
pub struct LogSink;

#[async_trait]
impl StatusSink for LogSink {
    async fn edit(&self, text: &str) -> Result<(), AppError> {
        log::info!("status: {}", text.replace('\n', " "));
        Ok(())
    }
}

/// The single status message of one job.
pub struct StatusMessage {
    sink: Arc<dyn StatusSink>,
    state: JobState,
    history: Vec<JobState>,
}

impl StatusMessage {
    /// Wraps a message that already shows the queued text.
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self {
            sink,
            state: JobState::Queued,
            history: vec![JobState::Queued],
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Every state this message has been in, oldest first.
    pub fn history(&self) -> &[JobState] {
        &self.history
    }

    /// Moves to `next` and edits the message to `text`.
    ///
    /// Edit failures are logged and swallowed: losing a progress line must not fail the
    /// job. Invalid transitions are rejected before anything is sent.
    pub async fn advance(&mut self, next: JobState, text: &str) -> Result<(), StatusError> {
        if !self.state.can_transition_to(&next) {
            return Err(StatusError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        self.state = next;
        self.history.push(next);

        if let Err(e) = self.sink.edit(text).await {
            log::warn!("Failed to edit status message ({:?}): {}", next, e);
        }
        Ok(())
    }

    /// [`advance`](Self::advance) for callers that cannot do anything about a rejected
    /// transition; it is logged and the message is left as it was.
    pub async fn set(&mut self, next: JobState, text: &str) {
        if let Err(e) = self.advance(next, text).await {
            log::error!("{}", e);
        }
    }
}
