//! Telegram-backed status message.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ParseMode};
use teloxide::ApiError;

use crate::core::error::AppError;
use crate::download::status::StatusSink;
use crate::telegram::Bot;

/// Edits one already-sent message in place.
pub struct TelegramStatus {
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
}

impl TelegramStatus {
    /// Sends the first version of the message and returns a sink bound to it.
    pub async fn send(bot: Bot, chat_id: ChatId, text: &str) -> Result<Self, AppError> {
        let sent = bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .await?;

        Ok(Self {
            bot,
            chat_id,
            message_id: sent.id,
        })
    }
}

#[async_trait]
impl StatusSink for TelegramStatus {
    async fn edit(&self, text: &str) -> Result<(), AppError> {
        match self
            .bot
            .edit_message_text(self.chat_id, self.message_id, text)
            .parse_mode(ParseMode::Html)
            .await
        {
            Ok(_) => Ok(()),
            // Same text twice in a row is not an error for us
            Err(teloxide::RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
