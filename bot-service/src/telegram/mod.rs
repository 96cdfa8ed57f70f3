pub mod actions;
pub mod handlers;
pub mod keyboards;
pub mod messages;
pub mod notifier;
pub mod update;

pub use actions::{ButtonAction, Command};
pub use notifier::{Delivery, Notifier, OutgoingMessage, RecordingNotifier, TelegramNotifier};
pub use update::{Inbound, WebhookUpdate};
