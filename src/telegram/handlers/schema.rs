//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::{handle_command, handle_token_message};
use super::types::{HandlerDeps, HandlerError};
use super::uploads::handle_link_message;
use crate::telegram::bot::Command;
use crate::telegram::router::{classify, Route};
use crate::telegram::Bot;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Order matters, the first matching branch wins:
/// 1. known commands
/// 2. text mentioning `http` → download job
/// 3. any other text → authorization code check
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_links = deps.clone();
    let deps_tokens = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(link_handler(deps_links))
        .branch(token_handler(deps_tokens))
}

fn route_of(msg: &Message) -> Option<Route> {
    msg.text().map(classify)
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);
                if let Err(e) = handle_command(&bot, &msg, cmd, &deps).await {
                    log::error!("Command handler failed for chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        },
    ))
}

fn link_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| route_of(&msg) == Some(Route::Download))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_link_message(&bot, &msg, &deps).await {
                    log::error!("Link handler failed for chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}

fn token_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| route_of(&msg) == Some(Route::Token))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_token_message(&bot, &msg, &deps).await {
                    log::error!("Token handler failed for chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}
