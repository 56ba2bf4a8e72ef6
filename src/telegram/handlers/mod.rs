//! Telegram bot handler tree configuration
//!
//! The same schema is used by the binary and by integration tests.

mod commands;
mod schema;
mod types;
mod uploads;

pub use commands::{auth_reply, revoke_reply, token_reply};
pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
