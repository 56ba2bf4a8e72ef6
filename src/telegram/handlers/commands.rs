//! Command and token handlers (/start, /help, /auth, /revoke, /update, auth codes)
//!
//! The reply text is built by plain async functions over the credential store so it can
//! be checked without a Telegram connection; the handlers only send it.

use teloxide::prelude::*;
use teloxide::types::{Message, ParseMode};
use unic_langid::LanguageIdentifier;

use super::types::{HandlerDeps, HandlerError};
use crate::core::types::UserKey;
use crate::core::utils::escape_html;
use crate::i18n;
use crate::storage::credentials::{AuthError, AuthStatus, CredentialStore, TokenOutcome};
use crate::telegram::bot::Command;
use crate::telegram::Bot;

/// Reply to `/auth`.
pub async fn auth_reply(store: &CredentialStore, user: UserKey, lang: &LanguageIdentifier) -> String {
    match store.authorize(user).await {
        Ok(AuthStatus::NeedsAuthorization(url)) => {
            let href = escape_html(&url);
            i18n::t_args(lang, "auth-url", &[("url", href.as_str())])
        }
        Ok(AuthStatus::Refreshed) => i18n::t(lang, "auth-refreshed"),
        Ok(AuthStatus::AlreadyAuthorized) => i18n::t(lang, "auth-already"),
        Err(AuthError::NotConfigured) => {
            log::error!("/auth from user {} but the Google OAuth client is not configured", user);
            i18n::t(lang, "auth-unavailable")
        }
        Err(e) => {
            log::error!("/auth failed for user {}: {}", user, e);
            i18n::t(lang, "auth-unavailable")
        }
    }
}

/// Reply to a text message that is neither a command nor a link; `None` means stay silent.
pub async fn token_reply(
    store: &CredentialStore,
    user: UserKey,
    text: &str,
    lang: &LanguageIdentifier,
) -> Option<String> {
    match store.submit_token(user, text).await {
        Ok(TokenOutcome::NotAToken) => None,
        Ok(TokenOutcome::Authorized) => Some(i18n::t(lang, "auth-success")),
        Err(e) => {
            log::warn!("Authorization of user {} failed: {}", user, e);
            Some(i18n::t(lang, "auth-error"))
        }
    }
}

/// Reply to `/revoke`.
pub async fn revoke_reply(store: &CredentialStore, user: UserKey, lang: &LanguageIdentifier) -> String {
    match store.revoke(user).await {
        Ok(()) => i18n::t(lang, "revoke-success"),
        Err(AuthError::NotAuthorized) => i18n::t(lang, "revoke-fail"),
        Err(e) => {
            log::error!("/revoke failed for user {}: {}", user, e);
            i18n::t(lang, "revoke-fail")
        }
    }
}

async fn reply_html(bot: &Bot, msg: &Message, text: String) -> Result<(), HandlerError> {
    bot.send_message(msg.chat.id, text).parse_mode(ParseMode::Html).await?;
    Ok(())
}

pub(super) async fn handle_command(bot: &Bot, msg: &Message, cmd: Command, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let user = UserKey::from_message(msg);
    let lang = &deps.lang;

    let text = match cmd {
        Command::Start => {
            let name = msg.from.as_ref().map(|u| u.first_name.as_str()).unwrap_or_default();
            let name = escape_html(name);
            i18n::t_args(lang, "start", &[("name", name.as_str())])
        }
        Command::Help => i18n::t(lang, "help"),
        Command::Auth => auth_reply(&deps.credentials, user, lang).await,
        Command::Revoke => revoke_reply(&deps.credentials, user, lang).await,
        Command::Update => i18n::t_args(lang, "update", &[("version", env!("CARGO_PKG_VERSION"))]),
    };

    reply_html(bot, msg, text).await
}

pub(super) async fn handle_token_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user = UserKey::from_message(msg);

    match token_reply(&deps.credentials, user, text, &deps.lang).await {
        Some(reply) => reply_html(bot, msg, reply).await,
        None => Ok(()),
    }
}
