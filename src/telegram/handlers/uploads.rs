//! Link messages: check authorization, post the status message, queue the job.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{Message, ParseMode};

use super::types::{HandlerDeps, HandlerError};
use crate::core::types::UserKey;
use crate::download::pipeline::Job;
use crate::download::status::StatusMessage;
use crate::i18n;
use crate::telegram::router::extract_url;
use crate::telegram::status::TelegramStatus;
use crate::telegram::Bot;

pub(super) async fn handle_link_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(url) = msg.text().and_then(extract_url) else {
        return Ok(());
    };
    let user = UserKey::from_message(msg);

    if !deps.credentials.exists(user).await {
        log::info!("User {} sent a link before authorizing", user);
        bot.send_message(msg.chat.id, i18n::t(&deps.lang, "not-authorized"))
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    let sink = TelegramStatus::send(bot.clone(), msg.chat.id, &i18n::t(&deps.lang, "status-queued")).await?;
    let mut status = StatusMessage::new(Arc::new(sink));
    let job = Job::new(user, url);

    log::info!(
        "Queued job {} for user {} ({} of {} workers free)",
        job.id,
        user,
        deps.workers.available(),
        deps.workers.capacity()
    );

    let pipeline = Arc::clone(&deps.pipeline);
    deps.workers.spawn(format!("job-{}", job.id), async move {
        pipeline.run(&job, &mut status).await;
    });

    Ok(())
}
