use async_trait::async_trait;
use shared::errors::{Result, ServiceError};
use shared::ChatId;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, ParseMode};
use tokio::sync::Mutex;

use crate::telegram::keyboards::{to_inline_markup, ButtonLayout};

fn map_teloxide_err<E: std::fmt::Display>(e: E) -> ServiceError {
    ServiceError::Delivery(e.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingMessage {
    pub text: String,
    pub html: bool,
    pub buttons: Option<ButtonLayout>,
}

impl OutgoingMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: false,
            buttons: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: true,
            buttons: None,
        }
    }

    pub fn with_buttons(mut self, layout: ButtonLayout) -> Self {
        self.buttons = Some(layout);
        self
    }
}

/// Outbound side of the chat. Callers log failures; nothing is retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: ChatId, message: OutgoingMessage) -> Result<()>;
    async fn acknowledge(&self, press_id: &str, text: Option<&str>) -> Result<()>;
}

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
    async fn send(&self, chat_id: ChatId, message: OutgoingMessage) -> Result<()> {
        let mut request = self
            .bot
            .send_message(teloxide::types::ChatId(chat_id.0), message.text);

        if message.html {
            request = request.parse_mode(ParseMode::Html);
        }
        if let Some(layout) = &message.buttons {
            request = request.reply_markup(to_inline_markup(layout));
        }

        request.await.map_err(map_teloxide_err)?;
        Ok(())
    }

    async fn acknowledge(&self, press_id: &str, text: Option<&str>) -> Result<()> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(press_id.to_string()));

        if let Some(text) = text {
            request = request.text(text);
        }

        request.await.map_err(map_teloxide_err)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent { chat_id: ChatId, message: OutgoingMessage },
    Acknowledged { press_id: String, text: Option<String> },
}

/// Keeps every outbound call in order; can be switched to fail sends.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    fail_sends: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            deliveries: Arc::default(),
            fail_sends: true,
        }
    }

    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    pub async fn sent_texts(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .await
            .iter()
            .filter_map(|d| match d {
                Delivery::Sent { message, .. } => Some(message.text.clone()),
                Delivery::Acknowledged { .. } => None,
            })
            .collect()
    }

    pub async fn acknowledgements(&self) -> usize {
        self.deliveries
            .lock()
            .await
            .iter()
            .filter(|d| matches!(d, Delivery::Acknowledged { .. }))
            .count()
    }

    pub async fn clear(&self) {
        self.deliveries.lock().await.clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat_id: ChatId, message: OutgoingMessage) -> Result<()> {
        if self.fail_sends {
            return Err(ServiceError::Delivery("chat not found".to_string()));
        }
        self.deliveries
            .lock()
            .await
            .push(Delivery::Sent { chat_id, message });
        Ok(())
    }

    async fn acknowledge(&self, press_id: &str, text: Option<&str>) -> Result<()> {
        self.deliveries.lock().await.push(Delivery::Acknowledged {
            press_id: press_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::keyboards::cancel_keyboard;

    #[test]
    fn test_message_builders() {
        let msg = OutgoingMessage::html("<b>hi</b>").with_buttons(cancel_keyboard());
        assert!(msg.html);
        assert_eq!(msg.buttons.as_ref().map(|b| b.len()), Some(1));
        assert!(!OutgoingMessage::plain("hi").html);
    }

    #[tokio::test]
    async fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.acknowledge("cb", None).await.unwrap();
        notifier.send(ChatId(1), OutgoingMessage::plain("one")).await.unwrap();

        let deliveries = notifier.deliveries().await;
        assert!(matches!(deliveries[0], Delivery::Acknowledged { .. }));
        assert_eq!(notifier.sent_texts().await, vec!["one".to_string()]);
        assert_eq!(notifier.acknowledgements().await, 1);
    }

    #[tokio::test]
    async fn test_failing_notifier_still_acknowledges() {
        let notifier = RecordingNotifier::failing();
        assert!(notifier.send(ChatId(1), OutgoingMessage::plain("x")).await.is_err());
        assert!(notifier.acknowledge("cb", Some("ok")).await.is_ok());
    }
}
