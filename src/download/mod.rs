//! Download management and the download-then-upload pipeline

pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod source;
pub mod status;
pub mod workspace;

// Re-exports for convenience
pub use error::DownloadError;
pub use pipeline::{Job, JobOutcome, Phase, Pipeline};
pub use resolver::SourceResolver;
pub use status::{JobState, ProcessingPhase, StatusMessage, StatusSink};
pub use workspace::JobWorkspace;
