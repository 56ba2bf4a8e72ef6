//! Identifiers shared across layers.

use std::fmt;

/// Stable key of a Telegram user.
///
/// Taken from the message sender, or from the chat id for updates without one (channel
/// posts). Its decimal form names the user's credential file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserKey(pub i64);

impl UserKey {
    pub fn from_message(msg: &teloxide::types::Message) -> Self {
        msg.from
            .as_ref()
            .and_then(|u| i64::try_from(u.id.0).ok())
            .map(UserKey)
            .unwrap_or(UserKey(msg.chat.id.0))
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
