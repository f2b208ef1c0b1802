//! SQLite subscription store: users, intervals, watchlists and lookup quota.

use crate::config::{LookupQuota, UserProfile};
use async_trait::async_trait;
use chrono::NaiveDate;
use coinwatch_core::{Subscription, Symbol, UserId, DEFAULT_INTERVAL_SECS, MIN_INTERVAL_SECS};
use coinwatch_engine::{BoxError, SubscriptionSource};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("User not registered: {0}")]
    UserNotFound(UserId),
    #[error("Interval changes require premium (user {0})")]
    NotPremium(UserId),
    #[error("Interval {requested}s is below the minimum of {minimum}s")]
    IntervalTooShort { requested: u64, minimum: u64 },
}

type UserRow = (
    i64,
    Option<String>,
    String,
    bool,
    i64,
    i64,
    i64,
    Option<NaiveDate>,
);

const USER_COLUMNS: &str = "id, username, full_name, is_premium, interval_secs, view_count, daily_views, last_view_date";

fn profile_from_row(row: UserRow) -> UserProfile {
    let (
        id,
        username,
        full_name,
        is_premium,
        interval_secs,
        view_count,
        daily_views,
        last_view_date,
    ) = row;
    UserProfile {
        id,
        username,
        full_name,
        is_premium,
        interval_secs: interval_secs.max(0) as u64,
        view_count: view_count.max(0) as u64,
        daily_views: daily_views.clamp(0, u32::MAX as i64) as u32,
        last_view_date,
    }
}

fn to_sql_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Database connection for the subscription store.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the SQLite database at the given URL and create tables.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // Every connection to `:memory:` is a separate database.
        let in_memory = database_url.contains(":memory:");
        let mut pool_options =
            SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        let db = Self { pool };
        db.run_migrations().await?;
        info!(url = database_url, "Subscription store ready");
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT,
                full_name TEXT NOT NULL DEFAULT '',
                is_premium INTEGER NOT NULL DEFAULT 0,
                interval_secs INTEGER NOT NULL DEFAULT 40,
                view_count INTEGER NOT NULL DEFAULT 0,
                daily_views INTEGER NOT NULL DEFAULT 0,
                last_view_date TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS watchlist (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                symbol TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, symbol)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_watchlist_user ON watchlist(user_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Register a user. Returns true if the user is new; an existing user
    /// only gets their names refreshed.
    pub async fn register_user(
        &self,
        user_id: UserId,
        username: Option<&str>,
        full_name: &str,
    ) -> Result<bool, DbError> {
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO users (id, username, full_name, interval_secs) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(username)
        .bind(full_name)
        .bind(to_sql_secs(DEFAULT_INTERVAL_SECS))
        .execute(&self.pool)
        .await?
        .rows_affected()
            == 1;

        if !inserted {
            sqlx::query("UPDATE users SET username = ?, full_name = ? WHERE id = ?")
                .bind(username)
                .bind(full_name)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        }

        debug!(user_id, new = inserted, "User registered");
        Ok(inserted)
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(profile_from_row))
    }

    pub async fn is_registered(&self, user_id: UserId) -> Result<bool, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Add a symbol to a user's watchlist. Returns false if already watched.
    pub async fn add_watch(&self, user_id: UserId, symbol: &Symbol) -> Result<bool, DbError> {
        if !self.is_registered(user_id).await? {
            return Err(DbError::UserNotFound(user_id));
        }

        let result = sqlx::query("INSERT OR IGNORE INTO watchlist (user_id, symbol) VALUES (?, ?)")
            .bind(user_id)
            .bind(symbol.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Remove a symbol from a user's watchlist. Returns false if it was not watched.
    pub async fn remove_watch(&self, user_id: UserId, symbol: &Symbol) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = ? AND symbol = ?")
            .bind(user_id)
            .bind(symbol.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Symbols watched by a user, oldest first.
    pub async fn list_watched_symbols(&self, user_id: UserId) -> Result<Vec<Symbol>, DbError> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT symbol FROM watchlist WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|s| Symbol::new(s)).collect())
    }

    /// Users with at least one watched symbol.
    pub async fn list_users_with_watches(&self) -> Result<Vec<Subscription>, DbError> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT u.id, u.interval_secs FROM users u
            WHERE EXISTS (SELECT 1 FROM watchlist w WHERE w.user_id = u.id)
            ORDER BY u.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, interval)| Subscription::new(id, interval.max(0) as u64))
            .collect())
    }

    /// Change a premium user's polling interval.
    pub async fn set_interval(&self, user_id: UserId, interval_secs: u64) -> Result<(), DbError> {
        let user = self
            .get_user(user_id)
            .await?
            .ok_or(DbError::UserNotFound(user_id))?;

        if !user.is_premium {
            return Err(DbError::NotPremium(user_id));
        }
        if interval_secs < MIN_INTERVAL_SECS {
            return Err(DbError::IntervalTooShort {
                requested: interval_secs,
                minimum: MIN_INTERVAL_SECS,
            });
        }

        sqlx::query("UPDATE users SET interval_secs = ? WHERE id = ?")
            .bind(to_sql_secs(interval_secs))
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        info!(user_id, interval_secs, "Interval updated");
        Ok(())
    }

    pub async fn set_premium(&self, user_id: UserId, is_premium: bool) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE users SET is_premium = ? WHERE id = ?")
            .bind(is_premium)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::UserNotFound(user_id));
        }
        Ok(())
    }

    /// Check the daily lookup allowance without counting anything.
    pub async fn lookup_quota(
        &self,
        user_id: UserId,
        today: NaiveDate,
        free_daily_limit: u32,
    ) -> Result<LookupQuota, DbError> {
        let user = self
            .get_user(user_id)
            .await?
            .ok_or(DbError::UserNotFound(user_id))?;
        Ok(user.lookup_quota(today, free_daily_limit))
    }

    /// Count a successful on-demand price lookup against the daily free limit.
    ///
    /// Premium users are never limited. The daily counter restarts when
    /// `today` differs from the last recorded lookup date. `Allowed` carries
    /// the lookups left after this one.
    pub async fn record_lookup(
        &self,
        user_id: UserId,
        today: NaiveDate,
        free_daily_limit: u32,
    ) -> Result<LookupQuota, DbError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        let user = row
            .map(profile_from_row)
            .ok_or(DbError::UserNotFound(user_id))?;

        if user.is_premium {
            sqlx::query("UPDATE users SET view_count = view_count + 1 WHERE id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(LookupQuota::Allowed { remaining: None });
        }

        let quota = user.lookup_quota(today, free_daily_limit);
        if !quota.is_allowed() {
            tx.rollback().await?;
            return Ok(quota);
        }

        let used = user.views_on(today);

        sqlx::query(
            "UPDATE users SET daily_views = ?, last_view_date = ?, view_count = view_count + 1 WHERE id = ?",
        )
        .bind(i64::from(used + 1))
        .bind(today)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(LookupQuota::Allowed {
            remaining: Some(free_daily_limit - used - 1),
        })
    }
}

#[async_trait]
impl SubscriptionSource for Database {
    async fn list_users_with_watches(&self) -> Result<Vec<Subscription>, BoxError> {
        Ok(Database::list_users_with_watches(self).await?)
    }

    async fn list_watched_symbols(&self, user_id: UserId) -> Result<Vec<Symbol>, BoxError> {
        Ok(Database::list_watched_symbols(self, user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn db() -> Database {
        Database::connect("sqlite::memory:").await.unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_get_user() {
        let db = db().await;

        assert!(db.register_user(42, Some("alice"), "Alice A").await.unwrap());
        assert!(!db.register_user(42, Some("alice2"), "Alice B").await.unwrap());

        let user = db.get_user(42).await.unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("alice2"));
        assert_eq!(user.full_name, "Alice B");
        assert_eq!(user.interval_secs, DEFAULT_INTERVAL_SECS);
        assert!(!user.is_premium);

        assert!(db.is_registered(42).await.unwrap());
        assert!(!db.is_registered(43).await.unwrap());
        assert_eq!(db.get_user(43).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_watchlist() {
        let db = db().await;
        db.register_user(1, None, "One").await.unwrap();
        let btc = Symbol::new("BTC");
        let eth = Symbol::new("ETH");

        assert!(db.add_watch(1, &btc).await.unwrap());
        assert!(!db.add_watch(1, &btc).await.unwrap());
        assert!(db.add_watch(1, &eth).await.unwrap());
        assert_eq!(
            db.list_watched_symbols(1).await.unwrap(),
            vec![btc.clone(), eth.clone()]
        );

        assert!(db.remove_watch(1, &btc).await.unwrap());
        assert!(!db.remove_watch(1, &btc).await.unwrap());
        assert_eq!(db.list_watched_symbols(1).await.unwrap(), vec![eth]);
    }

    #[tokio::test]
    async fn test_watch_requires_registration() {
        let db = db().await;
        let result = db.add_watch(7, &Symbol::new("BTC")).await;
        assert!(matches!(result, Err(DbError::UserNotFound(7))));
    }

    #[tokio::test]
    async fn test_users_with_watches() {
        let db = db().await;
        db.register_user(1, None, "One").await.unwrap();
        db.register_user(2, None, "Two").await.unwrap();
        db.register_user(3, None, "Three").await.unwrap();
        db.add_watch(1, &Symbol::new("BTC")).await.unwrap();
        db.add_watch(3, &Symbol::new("SOL")).await.unwrap();
        db.add_watch(3, &Symbol::new("TON")).await.unwrap();

        let subs = db.list_users_with_watches().await.unwrap();
        assert_eq!(
            subs,
            vec![Subscription::new(1, 40), Subscription::new(3, 40)]
        );

        db.remove_watch(1, &Symbol::new("BTC")).await.unwrap();
        let subs = SubscriptionSource::list_users_with_watches(&db).await.unwrap();
        assert_eq!(subs, vec![Subscription::new(3, 40)]);
    }

    #[tokio::test]
    async fn test_set_interval_rules() {
        let db = db().await;

        assert!(matches!(
            db.set_interval(5, 60).await,
            Err(DbError::UserNotFound(5))
        ));

        db.register_user(5, None, "Five").await.unwrap();
        assert!(matches!(
            db.set_interval(5, 60).await,
            Err(DbError::NotPremium(5))
        ));

        db.set_premium(5, true).await.unwrap();
        assert!(matches!(
            db.set_interval(5, 39).await,
            Err(DbError::IntervalTooShort {
                requested: 39,
                minimum: 40
            })
        ));

        db.set_interval(5, 120).await.unwrap();
        assert_eq!(db.get_user(5).await.unwrap().unwrap().interval_secs, 120);
    }

    #[tokio::test]
    async fn test_set_premium_unknown_user() {
        let db = db().await;
        assert!(matches!(
            db.set_premium(99, true).await,
            Err(DbError::UserNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_free_lookup_quota() {
        let db = db().await;
        db.register_user(10, None, "Ten").await.unwrap();

        for expected in (0..3).rev() {
            assert_eq!(
                db.record_lookup(10, day(1), 3).await.unwrap(),
                LookupQuota::Allowed {
                    remaining: Some(expected)
                }
            );
        }
        assert_eq!(
            db.record_lookup(10, day(1), 3).await.unwrap(),
            LookupQuota::Exhausted { limit: 3 }
        );

        // New day, fresh quota.
        assert_eq!(
            db.record_lookup(10, day(2), 3).await.unwrap(),
            LookupQuota::Allowed {
                remaining: Some(2)
            }
        );

        let user = db.get_user(10).await.unwrap().unwrap();
        assert_eq!(user.view_count, 4);
        assert_eq!(user.daily_views, 1);
        assert_eq!(user.last_view_date, Some(day(2)));
    }

    #[tokio::test]
    async fn test_premium_lookups_unlimited() {
        let db = db().await;
        db.register_user(11, None, "Eleven").await.unwrap();
        db.set_premium(11, true).await.unwrap();

        for _ in 0..10 {
            assert_eq!(
                db.record_lookup(11, day(1), 5).await.unwrap(),
                LookupQuota::Allowed { remaining: None }
            );
        }
        assert_eq!(db.get_user(11).await.unwrap().unwrap().view_count, 10);
    }

    #[tokio::test]
    async fn test_quota_check_does_not_count() {
        let db = db().await;
        db.register_user(13, None, "Thirteen").await.unwrap();

        for _ in 0..3 {
            assert_eq!(
                db.lookup_quota(13, day(1), 2).await.unwrap(),
                LookupQuota::Allowed { remaining: Some(2) }
            );
        }
        db.record_lookup(13, day(1), 2).await.unwrap();
        db.record_lookup(13, day(1), 2).await.unwrap();
        assert_eq!(
            db.lookup_quota(13, day(1), 2).await.unwrap(),
            LookupQuota::Exhausted { limit: 2 }
        );
        assert!(matches!(
            db.lookup_quota(99, day(1), 2).await,
            Err(DbError::UserNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_lookup_unknown_user() {
        let db = db().await;
        assert!(matches!(
            db.record_lookup(12, day(1), 5).await,
            Err(DbError::UserNotFound(12))
        ));
    }
}
