//! Bot initialization
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command menu registration

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config::Config;
use crate::telegram::Bot;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "introduction")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "connect your Google Drive")]
    Auth,
    #[command(description = "forget your Drive credentials")]
    Revoke,
    #[command(description = "what's new")]
    Update,
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Missing token, invalid API URL or HTTP client failure
pub fn create_bot(config: &Config) -> anyhow::Result<Bot> {
    let token = config.bot_token()?;
    // Long polling holds requests open, so the client timeout must exceed the poll timeout
    let client = ClientBuilder::new().timeout(config.http_timeout()).build()?;
    let bot = Bot::with_client(token, client);

    let bot = match config.bot_api_url.as_deref() {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(bot_api_url).map_err(|e| anyhow::anyhow!("Invalid bot_api_url: {}", e))?;
            bot.set_api_url(url)
        }
        None => bot,
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_parse() {
        assert_eq!(Command::parse("/auth", "drivelink_bot").unwrap(), Command::Auth);
        assert_eq!(Command::parse("/revoke", "drivelink_bot").unwrap(), Command::Revoke);
        assert!(Command::parse("/unknown", "drivelink_bot").is_err());
    }

    #[test]
    fn test_menu_lists_every_command() {
        let names: Vec<String> = Command::bot_commands()
            .into_iter()
            .map(|c| c.command.trim_start_matches('/').to_string())
            .collect();
        assert_eq!(names, vec!["start", "help", "auth", "revoke", "update"]);
    }
}
