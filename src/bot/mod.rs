pub mod commands;
pub mod handlers;
pub mod messenger;

use std::sync::Arc;
use teloxide::dispatching::{DpHandlerDescription, UpdateFilterExt};
use teloxide::dptree;
use teloxide::prelude::*;

use crate::ai::llm::TextGenerator;
use crate::config::AppConfig;
use crate::subscribers::{SubscriberId, SubscriberRegistry};
use messenger::Messenger;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Shared application state, accessible from all handlers and the broadcast task.
pub struct AppState {
    pub config: AppConfig,
    pub llm: Arc<dyn TextGenerator>,
    pub subscribers: Arc<SubscriberRegistry>,
    pub messenger: Arc<dyn Messenger>,
}

/// What a handler gets to see of one inbound Telegram message.
#[derive(Debug, Clone)]
pub struct IncomingUpdate {
    /// `None` for senderless updates such as channel posts.
    pub user: Option<SubscriberId>,
    pub text: String,
    pub command: Option<commands::BotCommand>,
}

impl IncomingUpdate {
    pub fn from_message(msg: &Message, command: Option<commands::BotCommand>) -> Self {
        Self {
            user: msg.from.as_ref().and_then(|u| match SubscriberId::try_from(u.id) {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!("User id {} does not fit a chat id, ignoring sender", u.id);
                    None
                }
            }),
            text: msg.text().unwrap_or_default().to_string(),
            command,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    MarkdownV2,
}

/// Exactly one outbound message produced by a handler or the broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub format: TextFormat,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Plain,
        }
    }

    /// `text` must already be valid MarkdownV2 (escaped where needed).
    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::MarkdownV2,
        }
    }
}

/// Build the teloxide update handler tree.
///
/// Unknown `/commands` fail `filter_command` and fall through to the text
/// branch, where they are treated as free text.
pub fn build_handler() -> Handler<'static, DependencyMap, HandlerResult, DpHandlerDescription> {
    let command_handler = Update::filter_message()
        .filter_command::<commands::BotCommand>()
        .endpoint(handlers::handle_command);

    let message_handler = Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(handlers::handle_message);

    dptree::entry()
        .branch(command_handler)
        .branch(message_handler)
}
