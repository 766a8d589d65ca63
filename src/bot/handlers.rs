use std::sync::Arc;
use teloxide::prelude::*;

use crate::bot::commands::{self, BotCommand};
use crate::bot::{AppState, HandlerResult, IncomingUpdate};

/// Endpoint for recognized `/commands`.
pub async fn handle_command(msg: Message, cmd: BotCommand, state: Arc<AppState>) -> HandlerResult {
    tracing::info!("Command {:?} in chat {}", cmd, msg.chat.id);
    let update = IncomingUpdate::from_message(&msg, Some(cmd));
    reply(&state, &msg, &update).await
}

/// Endpoint for every other text message, including unknown commands.
pub async fn handle_message(msg: Message, state: Arc<AppState>) -> HandlerResult {
    let update = IncomingUpdate::from_message(&msg, None);
    reply(&state, &msg, &update).await
}

async fn reply(state: &AppState, msg: &Message, update: &IncomingUpdate) -> HandlerResult {
    let reply = commands::dispatch(state, update).await;
    // Delivery failures end up in the dispatcher's error handler.
    state.messenger.send(msg.chat.id.0, &reply).await?;
    Ok(())
}
