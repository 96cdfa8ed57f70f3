use shared::{BotConfig, RedisConfig, TripEntry};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use trip_bot::sheets::{GoogleSheetsClient, Spreadsheet};
use trip_bot::store::{MemoryStore, RedisStore, StateStore};
use trip_bot::telegram::{Notifier, TelegramNotifier};
use trip_bot::{build_router, Dispatcher};

const GET_ME_ATTEMPTS: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    shared::init_tracing("trip-bot")
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let config = BotConfig::from_env()?;

    shared::init_metrics(config.service.metrics_port)
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!("Starting trip journal bot...");
    tracing::info!("Configuration:");
    tracing::info!("  Sheet ID: {}", config.sheets.sheet_id);
    tracing::info!("  Sheet name: {}", config.sheets.sheet_name);
    tracing::info!("  Timezone: {}", config.timezone);
    tracing::info!("  Admins: {}", config.admin_ids.len());
    tracing::info!("  Webhook port: {}", config.service.webhook_port);
    tracing::info!("  Webhook secret: {}", config.webhook_secret.is_some());

    let store: Arc<dyn StateStore> = match RedisConfig::from_env() {
        Some(redis) => {
            tracing::info!("Connecting to Redis...");
            let store = RedisStore::connect(&redis.url).await?;
            tracing::info!("✅ Connected to Redis");
            Arc::new(store)
        }
        None => {
            tracing::warn!("REDIS_URL not set, conversation state is kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let sheets = GoogleSheetsClient::new(reqwest::Client::new(), config.sheets.clone());
    match sheets.ensure_header(TripEntry::headers()).await {
        Ok(()) => tracing::info!("✅ Journal spreadsheet ready"),
        Err(e) if e.is_configuration() => {
            tracing::error!(error = %e, "Journal spreadsheet is not configured, entries cannot be saved")
        }
        Err(e) => tracing::warn!(error = %e, "Could not verify journal header, continuing"),
    }
    let sheet: Arc<dyn Spreadsheet> = Arc::new(sheets);

    let bot = Bot::new(config.bot_token.clone());
    let bot_username = fetch_username(&bot).await?;
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(bot));

    let webhook_port = config.service.webhook_port;
    let webhook_secret = config.webhook_secret.clone();
    let dispatcher = Arc::new(Dispatcher::new(
        store,
        notifier,
        sheet,
        Arc::new(config),
        bot_username,
    )?);

    let app = build_router(dispatcher, webhook_secret);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", webhook_port)).await?;
    tracing::info!("✅ Webhook server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn fetch_username(bot: &Bot) -> anyhow::Result<String> {
    let mut attempt = 0;

    loop {
        attempt += 1;
        match bot.get_me().await {
            Ok(me) => {
                tracing::info!("Bot username: @{}", me.username());
                return Ok(me.username().to_string());
            }
            Err(e) if attempt < GET_ME_ATTEMPTS => {
                tracing::warn!("Failed to get bot info (will retry): {}", e);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => return Err(anyhow::anyhow!("Failed to get bot info: {}", e)),
        }
    }
}
