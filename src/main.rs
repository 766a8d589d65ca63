use std::sync::Arc;

use anyhow::Context;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing_subscriber::EnvFilter;

mod ai;
mod bot;
mod broadcast;
mod config;
mod error;
mod schedule;
mod subscribers;

use bot::commands::BotCommand;
use bot::messenger::TelegramMessenger;
use broadcast::BroadcastTask;
use config::AppConfig;
use subscribers::SubscriberRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("📰 Starting news bot...");

    // Load config; anything missing stops us here
    let config = AppConfig::from_env()?;
    tracing::info!(
        "Config loaded. Model: {}, broadcast at {} {}",
        config.yandex_model_uri,
        config.broadcast_time.format("%H:%M"),
        config.broadcast_timezone.name()
    );

    let bot = Bot::new(&config.telegram_bot_token);
    // A rejected token must stop us before the timer starts or polling begins
    let me = bot
        .get_me()
        .await
        .context("TELEGRAM_TOKEN rejected by Telegram")?;
    tracing::info!("Authorized as @{}", me.username());

    let llm_client = ai::llm::YandexGptClient::new(&config)?;

    // Build shared application state
    let state = Arc::new(bot::AppState {
        config: config.clone(),
        llm: Arc::new(llm_client),
        subscribers: Arc::new(SubscriberRegistry::new()),
        messenger: Arc::new(TelegramMessenger::new(bot.clone())),
    });

    if let Err(e) = bot.set_my_commands(BotCommand::bot_commands()).await {
        tracing::warn!("Could not register the command menu: {}", e);
    }

    // Daily broadcast timer
    let broadcast = Arc::new(BroadcastTask::new(state.clone()));
    let timer = tokio::spawn(schedule::run_daily(config.broadcast_schedule(), broadcast));

    // Build the dispatcher
    let handler = bot::build_handler();

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update: {:?}", upd.kind);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred while handling an update",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    timer.abort();
    tracing::info!("Bot stopped.");

    Ok(())
}
