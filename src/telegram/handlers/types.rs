//! Handler types and dependencies

use std::sync::Arc;

use unic_langid::LanguageIdentifier;

use crate::core::worker_pool::WorkerPool;
use crate::download::pipeline::Pipeline;
use crate::storage::credentials::CredentialStore;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub credentials: Arc<CredentialStore>,
    pub pipeline: Arc<Pipeline>,
    pub workers: WorkerPool,
    pub lang: LanguageIdentifier,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(pipeline: Arc<Pipeline>, workers: WorkerPool, lang: LanguageIdentifier) -> Self {
        Self {
            credentials: Arc::clone(pipeline.credentials()),
            pipeline,
            workers,
            lang,
        }
    }
}
