//! Telegram delivery for scheduler notifications.

use async_trait::async_trait;
use coinwatch_core::UserId;
use coinwatch_engine::{BoxError, Notifier};
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::debug;

/// Sends scheduler messages to users' private chats as HTML.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, user_id: UserId, message: &str) -> Result<(), BoxError> {
        self.bot
            .send_message(ChatId(user_id), message)
            .parse_mode(ParseMode::Html)
            .await?;
        debug!(user_id, "Notification delivered");
        Ok(())
    }
}
