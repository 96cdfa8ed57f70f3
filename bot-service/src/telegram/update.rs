use serde::Deserialize;
use shared::errors::{Result, ServiceError};
use shared::{ChatId, UserId};

/// The subset of a Telegram `Update` the bot reads. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct WebhookUpdate {
    pub update_id: Option<i64>,
    pub message: Option<IncomingMessage>,
    pub callback_query: Option<IncomingCallback>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub chat: ChatRef,
    pub from: Option<UserRef>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingCallback {
    pub id: String,
    pub from: UserRef,
    pub message: Option<IncomingMessage>,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRef {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UserRef {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message {
        chat_id: ChatId,
        user_id: UserId,
        text: String,
    },
    ButtonPress {
        chat_id: ChatId,
        user_id: UserId,
        data: String,
        press_id: String,
    },
}

impl Inbound {
    pub fn user_id(&self) -> UserId {
        match self {
            Inbound::Message { user_id, .. } | Inbound::ButtonPress { user_id, .. } => *user_id,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            Inbound::Message { chat_id, .. } | Inbound::ButtonPress { chat_id, .. } => *chat_id,
        }
    }
}

impl TryFrom<WebhookUpdate> for Inbound {
    type Error = ServiceError;

    fn try_from(update: WebhookUpdate) -> Result<Self> {
        if let Some(callback) = update.callback_query {
            // Inline-mode presses carry no message; private chat ids equal user ids.
            let chat_id = callback
                .message
                .as_ref()
                .map(|m| m.chat.id)
                .unwrap_or(callback.from.id);

            return Ok(Inbound::ButtonPress {
                chat_id: ChatId(chat_id),
                user_id: UserId(callback.from.id),
                data: callback.data.unwrap_or_default(),
                press_id: callback.id,
            });
        }

        if let Some(message) = update.message {
            let from = message.from.ok_or_else(|| {
                ServiceError::Classification("message without sender".to_string())
            })?;
            let text = message.text.ok_or_else(|| {
                ServiceError::Classification("message without text".to_string())
            })?;

            return Ok(Inbound::Message {
                chat_id: ChatId(message.chat.id),
                user_id: UserId(from.id),
                text,
            });
        }

        Err(ServiceError::Classification(format!(
            "update {:?} is neither a message nor a callback query",
            update.update_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(value: serde_json::Value) -> Result<Inbound> {
        let update: WebhookUpdate = serde_json::from_value(value).unwrap();
        Inbound::try_from(update)
    }

    #[test]
    fn test_text_message() {
        let inbound = classify(json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "date": 1726912800,
                "chat": { "id": 555, "type": "private" },
                "from": { "id": 42, "is_bot": false, "first_name": "Ivan" },
                "text": "/start"
            }
        }))
        .unwrap();

        assert_eq!(
            inbound,
            Inbound::Message {
                chat_id: ChatId(555),
                user_id: UserId(42),
                text: "/start".to_string(),
            }
        );
    }

    #[test]
    fn test_callback_query() {
        let inbound = classify(json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb-1",
                "from": { "id": 42, "is_bot": false, "first_name": "Ivan" },
                "message": { "chat": { "id": 555 } },
                "data": "confirm_save"
            }
        }))
        .unwrap();

        assert_eq!(inbound.chat_id(), ChatId(555));
        assert_eq!(inbound.user_id(), UserId(42));
        assert!(matches!(inbound, Inbound::ButtonPress { ref data, .. } if data == "confirm_save"));
    }

    #[test]
    fn test_callback_without_message_uses_sender_chat() {
        let inbound = classify(json!({
            "callback_query": { "id": "cb-2", "from": { "id": 9 }, "data": "help" }
        }))
        .unwrap();
        assert_eq!(inbound.chat_id(), ChatId(9));
    }

    #[test]
    fn test_sticker_is_classification_error() {
        let err = classify(json!({
            "update_id": 3,
            "message": { "chat": { "id": 1 }, "from": { "id": 1 }, "sticker": {} }
        }))
        .unwrap_err();
        assert!(matches!(err, ServiceError::Classification(_)));
    }

    #[test]
    fn test_edited_message_is_classification_error() {
        let err = classify(json!({ "update_id": 4, "edited_message": {} })).unwrap_err();
        assert!(matches!(err, ServiceError::Classification(_)));
    }
}
