use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::{Bot, RequestError};

/// Best-effort admin notification. Callers fire this off a spawned task;
/// a delivery failure is logged and never affects the ledger write that
/// triggered it.
pub async fn send_message_to_admin(
    bot: &Bot,
    admin_chat_id: i64,
    message: String,
) -> Result<(), RequestError> {
    bot.send_message(ChatId(admin_chat_id), message)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub fn notify_admin(bot: Bot, admin_chat_id: i64, message: String) {
    tokio::spawn(async move {
        if let Err(e) = send_message_to_admin(&bot, admin_chat_id, message).await {
            tracing::warn!("failed to notify admin chat {}: {}", admin_chat_id, e);
        }
    });
}
