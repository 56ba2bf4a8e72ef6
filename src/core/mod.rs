//! Core utilities, configuration, and common functionality

pub mod config;
pub mod error;
pub mod logging;
pub mod types;
pub mod utils;
pub mod worker_pool;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_startup_configuration};
pub use types::UserKey;
pub use worker_pool::WorkerPool;
