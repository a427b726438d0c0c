use anyhow::Context;
use dotenv::dotenv;
use maktaba::bots::digest_bot::{BotConfig, BotService};
use maktaba::config::AppConfig;
use maktaba::db::{create_pool, run_migrations};
use maktaba::http_server::run_http_server;
use tokio::task;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let pool = create_pool(&config.database_url).context("Failed to create database pool")?;
    run_migrations(&pool).context("Failed to run migrations")?;

    let bot = BotService::new(
        BotConfig {
            token: config.bot_token.clone(),
            admin_chat_id: config.admin_chat_id,
            admin_notifications: config.is_admin_logs_active(),
            ledger: config.ledger.clone(),
        },
        pool.clone(),
    );
    task::spawn(bot.run_bot());

    run_http_server(pool, config.port)
        .await
        .context("Http server error")?;

    Ok(())
}
