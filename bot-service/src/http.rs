use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use shared::record_counter;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::dispatcher::Dispatcher;

pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub webhook_secret: Option<Arc<str>>,
}

pub fn build_router(dispatcher: Arc<Dispatcher>, webhook_secret: Option<String>) -> Router {
    let state = AppState {
        dispatcher,
        webhook_secret: webhook_secret.map(Arc::from),
    };

    Router::new()
        .route("/webhook", post(webhook_handler).fallback(not_found))
        .route("/health", get(health_check).fallback(not_found))
        .fallback(not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Always answers 200 "OK"; unusable updates are dropped.
async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> &'static str {
    if let Some(expected) = &state.webhook_secret {
        let provided = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());

        if provided != Some(expected.as_ref()) {
            warn!("Webhook request with missing or wrong secret token");
            record_counter("bot_updates_ignored_total", 1);
            return "OK";
        }
    }

    state.dispatcher.handle_webhook_body(&body).await;
    "OK"
}

async fn health_check() -> &'static str {
    "Bot is running"
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
