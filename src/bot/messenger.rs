use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot::{Reply, TextFormat};
use crate::error::DeliveryError;

/// Outbound side of the messaging platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<(), DeliveryError>;
}

pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<(), DeliveryError> {
        let mut request = self.bot.send_message(ChatId(chat_id), reply.text.clone());
        if reply.format == TextFormat::MarkdownV2 {
            request = request.parse_mode(ParseMode::MarkdownV2);
        }

        request
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::new(chat_id, e.to_string()))
    }
}
