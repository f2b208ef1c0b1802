//! Coinwatch Bot - Telegram crypto price watcher
//!
//! Runs the Telegram front-end and the price watch scheduler side by side.

mod config;

use clap::Parser;
use coinwatch_alerts::{Database, TelegramBot, TelegramNotifier};
use coinwatch_engine::{PriceGateway, PriceWatchScheduler};
use coinwatch_feeds::FallbackGateway;
use config::AppConfig;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use teloxide::Bot;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Coinwatch Bot CLI
#[derive(Parser, Debug)]
#[command(name = "coinwatch-bot")]
#[command(about = "Telegram bot for crypto prices and price-change alerts", long_about = None)]
struct Args {
    /// Configuration file path (defaults are used if it does not exist)
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Log level: trace, debug, info, warn, error (overrides the config file)
    #[arg(short, long)]
    log_level: Option<String>,
}

/// `RUST_LOG` wins over `level` when set.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(normalize_level(level)));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn normalize_level(level: &str) -> &'static str {
    match level.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Keep a long-running task alive. Each time it exits or panics, wait
/// `restart_delay` and start a fresh one from `make`.
async fn supervise<F, Fut>(name: &'static str, restart_delay: Duration, make: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        match tokio::spawn(make()).await {
            Ok(()) => warn!(task = name, "Task exited, restarting"),
            Err(e) if e.is_panic() => error!(task = name, "Task panicked, restarting"),
            Err(_) => return,
        }
        tokio::time::sleep(restart_delay).await;
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let loaded = AppConfig::load(Path::new(&args.config));
    let level = args
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|c| c.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level);

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return;
        }
    };
    config.apply_env(|key| std::env::var(key).ok());

    info!("🚀 Coinwatch Bot starting...");
    info!("  Config: {}", args.config);
    info!("  Database: {}", config.database_url);
    info!(
        "  Tick: {}s | Backoff: {}s | Threshold: {}%",
        config.scheduler.tick_period_secs,
        config.scheduler.failure_backoff_secs,
        config.scheduler.change_threshold_pct
    );
    if config.sources.coinmarketcap_api_key.is_none() {
        warn!("  COINMARKETCAP_API_KEY not set, CoinMarketCap will be skipped");
    }

    let Some(token) = config.telegram_bot_token.clone() else {
        error!("TELEGRAM_BOT_TOKEN is not set");
        return;
    };

    let db = match Database::connect(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return;
        }
    };

    let gateway: Arc<dyn PriceGateway> = match FallbackGateway::from_endpoints(&config.sources) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            error!("Failed to build price gateway: {}", e);
            return;
        }
    };

    let bot = Bot::new(token);

    let scheduler_config = config.scheduler.clone();
    let store = Arc::new(db.clone());
    let scheduler_gateway = gateway.clone();
    let notifier = Arc::new(TelegramNotifier::new(bot.clone()));
    let restart_delay = scheduler_config.tick_period();
    let scheduler_handle = tokio::spawn(supervise("scheduler", restart_delay, move || {
        PriceWatchScheduler::new(
            scheduler_config.clone(),
            store.clone(),
            scheduler_gateway.clone(),
            notifier.clone(),
        )
        .run()
    }));

    let front_end = Arc::new(TelegramBot::new(
        bot,
        db,
        gateway,
        config.free_daily_lookups,
    ));
    let bot_handle = tokio::spawn(front_end.run());

    info!("Press Ctrl+C to stop...");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }

    warn!("Shutdown signal received");
    scheduler_handle.abort();
    bot_handle.abort();

    info!("👋 Coinwatch Bot stopped");
}
