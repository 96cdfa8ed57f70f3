pub mod dispatcher;
pub mod http;
pub mod journal;
pub mod sheets;
pub mod state;
pub mod store;
pub mod telegram;
pub mod time_utils;

pub use dispatcher::{BotContext, Dispatcher};
pub use http::build_router;
