//! Telegram bot command handlers.

use crate::config::{LookupQuota, UserProfile};
use crate::db::{Database, DbError};
use chrono::Utc;
use coinwatch_core::{PriceSnapshot, Symbol, MIN_INTERVAL_SECS};
use coinwatch_engine::{format_snapshot_lines, PriceGateway};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

/// Bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Register and start using the bot")]
    Start,
    #[command(description = "Current price. Usage: /price BTC")]
    Price(String),
    #[command(description = "Get notified when a price moves. Usage: /watch BTC")]
    Watch(String),
    #[command(description = "Stop watching a coin. Usage: /unwatch BTC")]
    Unwatch(String),
    #[command(description = "Show watched coins")]
    Watchlist,
    #[command(description = "Set check interval in seconds (premium). Usage: /interval 60")]
    Interval(String),
    #[command(description = "Show your profile")]
    Profile,
    #[command(description = "Show help")]
    Help,
}

/// Telegram front-end: registration, lookups and watchlist management.
pub struct TelegramBot {
    bot: Bot,
    db: Database,
    gateway: Arc<dyn PriceGateway>,
    free_daily_lookups: u32,
}

impl TelegramBot {
    pub fn new(
        bot: Bot,
        db: Database,
        gateway: Arc<dyn PriceGateway>,
        free_daily_lookups: u32,
    ) -> Self {
        Self {
            bot,
            db,
            gateway,
            free_daily_lookups,
        }
    }

    /// Run the bot command handler until the process stops.
    pub async fn run(self: Arc<Self>) {
        let bot = self.bot.clone();
        let handler = Update::filter_message().filter_command::<Command>().endpoint(
            move |bot: Bot, msg: Message, cmd: Command| {
                let this = Arc::clone(&self);
                async move { this.handle_command(bot, msg, cmd).await }
            },
        );

        info!("Telegram front-end started");
        Dispatcher::builder(bot, handler).build().dispatch().await;
    }

    async fn handle_command(
        &self,
        bot: Bot,
        msg: Message,
        cmd: Command,
    ) -> Result<(), TelegramError> {
        let user_id = msg.chat.id.0;

        if !matches!(cmd, Command::Start | Command::Help) && !self.db.is_registered(user_id).await? {
            bot.send_message(msg.chat.id, "Please /start first to register.")
                .await?;
            return Ok(());
        }

        let reply = match cmd {
            Command::Start => {
                let (username, full_name) = match msg.from.as_ref() {
                    Some(user) => (user.username.clone(), user.full_name()),
                    None => (None, String::new()),
                };
                let is_new = self
                    .db
                    .register_user(user_id, username.as_deref(), &full_name)
                    .await?;
                if is_new {
                    info!(user_id, "New user registered");
                }
                welcome_text(&full_name, is_new)
            }

            Command::Price(raw) => match Symbol::parse(&raw) {
                Ok(symbol) => self.lookup(user_id, symbol).await?,
                Err(_) => symbol_usage("price"),
            },

            Command::Watch(raw) => match Symbol::parse(&raw) {
                Ok(symbol) => {
                    if self.db.add_watch(user_id, &symbol).await? {
                        format!(
                            "✅ <b>{}</b> added. You will be notified when its price changes.",
                            symbol
                        )
                    } else {
                        format!("<b>{}</b> is already on your watchlist.", symbol)
                    }
                }
                Err(_) => symbol_usage("watch"),
            },

            Command::Unwatch(raw) => match Symbol::parse(&raw) {
                Ok(symbol) => {
                    if self.db.remove_watch(user_id, &symbol).await? {
                        format!("🗑 <b>{}</b> removed from your watchlist.", symbol)
                    } else {
                        format!("<b>{}</b> is not on your watchlist.", symbol)
                    }
                }
                Err(_) => symbol_usage("unwatch"),
            },

            Command::Watchlist => {
                let symbols = self.db.list_watched_symbols(user_id).await?;
                watchlist_text(&symbols)
            }

            Command::Interval(raw) => match parse_interval(&raw) {
                Some(secs) => match self.db.set_interval(user_id, secs).await {
                    Ok(()) => format!("🕒 Check interval set to {}s.", secs),
                    Err(DbError::NotPremium(_)) => {
                        "⭐ Changing the interval is a premium feature.".to_string()
                    }
                    Err(DbError::IntervalTooShort { minimum, .. }) => {
                        format!("⚠️ Minimum interval is {}s.", minimum)
                    }
                    Err(e) => return Err(e.into()),
                },
                None => format!(
                    "Usage: /interval &lt;seconds&gt;\nMinimum: {}s",
                    MIN_INTERVAL_SECS
                ),
            },

            Command::Profile => match self.db.get_user(user_id).await? {
                Some(user) => {
                    let today = Utc::now().date_naive();
                    let used = user.views_on(today);
                    profile_text(&user, used, self.free_daily_lookups)
                }
                None => "Please /start first to register.".to_string(),
            },

            Command::Help => html::escape(&Command::descriptions().to_string()),
        };

        bot.send_message(msg.chat.id, reply)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    /// Only lookups that return a price count against the daily quota.
    async fn lookup(&self, user_id: i64, symbol: Symbol) -> Result<String, TelegramError> {
        let today = Utc::now().date_naive();
        let quota = self
            .db
            .lookup_quota(user_id, today, self.free_daily_lookups)
            .await?;
        if let LookupQuota::Exhausted { limit } = quota {
            return Ok(exhausted_text(limit));
        }

        let result = self.gateway.fetch_prices(std::slice::from_ref(&symbol)).await;
        let text = match result {
            Ok(prices) => match prices.into_iter().next().flatten() {
                Some(snapshot) => {
                    let recorded = self
                        .db
                        .record_lookup(user_id, today, self.free_daily_lookups)
                        .await?;
                    let remaining = match recorded {
                        LookupQuota::Allowed { remaining } => remaining,
                        LookupQuota::Exhausted { .. } => Some(0),
                    };
                    price_text(&snapshot, remaining)
                }
                None => format!("❌ No price found for <b>{}</b>.", symbol),
            },
            Err(e) => {
                warn!(user_id, symbol = %symbol, error = %e, "Lookup failed");
                "⚠️ Price sources are unavailable right now. Please try again later.".to_string()
            }
        };
        Ok(text)
    }
}

fn welcome_text(full_name: &str, is_new: bool) -> String {
    let greeting = if full_name.is_empty() {
        "Welcome!".to_string()
    } else {
        format!("Welcome, {}!", html::escape(full_name))
    };
    let status = if is_new {
        "You are registered."
    } else {
        "You are already registered."
    };
    format!(
        "{}\n\n{}\n\
         Look up a price with /price BTC and add coins to your watchlist with /watch BTC.\n\
         Use /help to see all commands.",
        greeting, status
    )
}

fn exhausted_text(limit: u32) -> String {
    format!(
        "⚠️ Today's free limit ({} lookups) is used up. Try again tomorrow or get premium.",
        limit
    )
}

fn symbol_usage(command: &str) -> String {
    format!(
        "Send a coin ticker of at least 2 letters.\nUsage: /{} BTC",
        command
    )
}

/// Parse a positive whole number of seconds.
fn parse_interval(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|secs| *secs > 0)
}

fn watchlist_text(symbols: &[Symbol]) -> String {
    if symbols.is_empty() {
        return "Your watchlist is empty. Add a coin with /watch BTC".to_string();
    }
    let list = symbols
        .iter()
        .map(|s| format!("• <b>{}</b>", s))
        .collect::<Vec<_>>()
        .join("\n");
    format!("📋 <b>Watchlist</b>\n\n{}", list)
}

fn price_text(snapshot: &PriceSnapshot, remaining: Option<u32>) -> String {
    let mut text = format!(
        "💰 <b>{}</b>\n{}   <i>source: {}</i>",
        snapshot.symbol,
        format_snapshot_lines(snapshot),
        snapshot.source
    );
    if let Some(remaining) = remaining {
        text.push_str(&format!("\n\nFree lookups left today: {}", remaining));
    }
    text
}

fn profile_text(user: &UserProfile, used_today: u32, free_daily_lookups: u32) -> String {
    let plan = if user.is_premium { "⭐ Premium" } else { "Free" };
    let lookups = if user.is_premium {
        "unlimited".to_string()
    } else {
        format!("{}/{} today", used_today, free_daily_lookups)
    };
    format!(
        "👤 <b>{}</b>\n\nPlan: {}\nCheck interval: {}s\nLookups: {}\nTotal lookups: {}",
        html::escape(&user.full_name),
        plan,
        user.interval_secs,
        lookups,
        user.view_count
    )
}
