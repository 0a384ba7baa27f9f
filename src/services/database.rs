use crate::error::{AppError, Result};
use crate::models::{CoinMarket, HistoryPoint, UserPreference};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// SQLite-backed persisted store for history series, the market snapshot
/// cache and user preferences.
///
/// History series are keyed by symbol and only ever replaced wholesale
/// (delete-then-insert in one transaction); see [`Self::replace_history`].
#[derive(Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database and run schema setup.
    pub async fn new(database_path: PathBuf) -> Result<Self> {
        info!("Initializing SQLite database at: {:?}", database_path);

        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Database(format!("Failed to create database directory: {}", e))
            })?;
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30))
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(connect_options).await?;

        let store = Self { pool };
        store.initialize_schema().await?;

        info!("SQLite database initialized successfully");
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS crypto_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                price REAL NOT NULL,
                market_cap REAL NOT NULL,
                volume_24h REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // The only secondary index: series are always read by symbol.
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_crypto_history_symbol ON crypto_history(symbol)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS market_cache (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                name TEXT NOT NULL,
                price REAL NOT NULL,
                market_cap REAL NOT NULL,
                volume_24h REAL NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_preferences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                symbol TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All stored history rows for a symbol, ordered by date ascending.
    pub async fn history_for_symbol(&self, symbol: &str) -> Result<Vec<HistoryPoint>> {
        let rows = sqlx::query(
            r#"
            SELECT symbol, date, price, market_cap, volume_24h
            FROM crypto_history
            WHERE symbol = ?1
            ORDER BY date ASC
            "#,
        )
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_history_point).collect()
    }

    /// Number of stored history rows for a symbol.
    pub async fn history_count(&self, symbol: &str) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM crypto_history WHERE symbol = ?1")
            .bind(symbol)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Replace the stored series for a symbol: delete every existing row,
    /// then bulk-insert the new batch, inside a single transaction. A reader
    /// sees the old set or the new set, never a mix (absent a concurrent
    /// writer; there is no per-symbol lock).
    pub async fn replace_history(&self, symbol: &str, records: &[HistoryPoint]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM crypto_history WHERE symbol = ?1")
            .bind(symbol)
            .execute(&mut *tx)
            .await?;

        for point in records {
            sqlx::query(
                r#"
                INSERT INTO crypto_history (symbol, date, price, market_cap, volume_24h)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&point.symbol)
            .bind(point.date)
            .bind(point.price)
            .bind(point.market_cap)
            .bind(point.volume_24h)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    /// Overwrite the market snapshot cache with a fresh listing.
    pub async fn save_market_snapshot(&self, markets: &[CoinMarket]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM market_cache").execute(&mut *tx).await?;

        for market in markets {
            sqlx::query(
                r#"
                INSERT INTO market_cache (symbol, name, price, market_cap, volume_24h, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&market.symbol)
            .bind(&market.name)
            .bind(market.price)
            .bind(market.market_cap)
            .bind(market.volume_24h)
            .bind(market.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(markets.len())
    }

    /// The cached market snapshot in insertion order.
    pub async fn latest_market_snapshot(&self) -> Result<Vec<CoinMarket>> {
        let rows = sqlx::query(
            "SELECT symbol, name, price, market_cap, volume_24h, updated_at FROM market_cache ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_coin_market).collect()
    }

    /// All watchlist entries for one user.
    pub async fn preferences_for_user(&self, user_id: &str) -> Result<Vec<UserPreference>> {
        let rows = sqlx::query(
            "SELECT id, user_id, symbol FROM user_preferences WHERE user_id = ?1 ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(UserPreference {
                    id: row.try_get("id").map_err(|e| AppError::Database(e.to_string()))?,
                    user_id: row
                        .try_get("user_id")
                        .map_err(|e| AppError::Database(e.to_string()))?,
                    symbol: row
                        .try_get("symbol")
                        .map_err(|e| AppError::Database(e.to_string()))?,
                })
            })
            .collect()
    }

    /// Add a watchlist entry and return its row id.
    pub async fn add_preference(&self, user_id: &str, symbol: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO user_preferences (user_id, symbol) VALUES (?1, ?2)")
            .bind(user_id)
            .bind(symbol)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Remove a watchlist entry. Returns whether anything was deleted.
    pub async fn remove_preference(&self, user_id: &str, symbol: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_preferences WHERE user_id = ?1 AND symbol = ?2")
            .bind(user_id)
            .bind(symbol)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store-wide counters for /health and the status command.
    pub async fn stats(&self) -> Result<StoreStats> {
        let history_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM crypto_history")
            .fetch_one(&self.pool)
            .await?;

        let history_symbols: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT symbol) FROM crypto_history")
                .fetch_one(&self.pool)
                .await?;

        let cached_markets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM market_cache")
            .fetch_one(&self.pool)
            .await?;

        let preference_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_preferences")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            history_records,
            history_symbols,
            cached_markets,
            preference_count,
        })
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Store-wide counters.
#[derive(Debug)]
pub struct StoreStats {
    pub history_records: i64,
    pub history_symbols: i64,
    pub cached_markets: i64,
    pub preference_count: i64,
}

fn row_to_history_point(row: sqlx::sqlite::SqliteRow) -> Result<HistoryPoint> {
    let date: NaiveDate = row
        .try_get("date")
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(HistoryPoint {
        symbol: row
            .try_get("symbol")
            .map_err(|e| AppError::Database(e.to_string()))?,
        date,
        price: row
            .try_get("price")
            .map_err(|e| AppError::Database(e.to_string()))?,
        market_cap: row
            .try_get("market_cap")
            .map_err(|e| AppError::Database(e.to_string()))?,
        volume_24h: row
            .try_get("volume_24h")
            .map_err(|e| AppError::Database(e.to_string()))?,
    })
}

fn row_to_coin_market(row: sqlx::sqlite::SqliteRow) -> Result<CoinMarket> {
    let updated_at: DateTime<Utc> = row
        .try_get("updated_at")
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(CoinMarket {
        symbol: row
            .try_get("symbol")
            .map_err(|e| AppError::Database(e.to_string()))?,
        name: row
            .try_get("name")
            .map_err(|e| AppError::Database(e.to_string()))?,
        price: row
            .try_get("price")
            .map_err(|e| AppError::Database(e.to_string()))?,
        market_cap: row
            .try_get("market_cap")
            .map_err(|e| AppError::Database(e.to_string()))?,
        volume_24h: row
            .try_get("volume_24h")
            .map_err(|e| AppError::Database(e.to_string()))?,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn point(symbol: &str, ymd: (i32, u32, u32), price: f64) -> HistoryPoint {
        HistoryPoint {
            symbol: symbol.to_string(),
            date: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap(),
            price,
            market_cap: price * 1000.0,
            volume_24h: price * 10.0,
        }
    }

    async fn test_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("test.db")).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn history_reads_back_ordered_by_date_ascending() {
        let (store, _dir) = test_store().await;

        // Insert out of order; the read must come back chronological.
        let records = vec![
            point("BTC", (2025, 1, 3), 96000.0),
            point("BTC", (2025, 1, 1), 94000.0),
            point("BTC", (2025, 1, 2), 95000.0),
        ];
        store.replace_history("BTC", &records).await.unwrap();

        let stored = store.history_for_symbol("BTC").await.unwrap();
        let dates: Vec<_> = stored.iter().map(|p| p.date.to_string()).collect();
        assert_eq!(dates, vec!["2025-01-01", "2025-01-02", "2025-01-03"]);
    }

    #[tokio::test]
    async fn replace_swaps_the_full_series() {
        let (store, _dir) = test_store().await;

        let old_set = vec![
            point("BTC", (2025, 1, 1), 94000.0),
            point("BTC", (2025, 1, 2), 95000.0),
            point("BTC", (2025, 1, 3), 96000.0),
        ];
        store.replace_history("BTC", &old_set).await.unwrap();

        let new_set = vec![
            point("BTC", (2025, 2, 1), 99000.0),
            point("BTC", (2025, 2, 2), 99500.0),
        ];
        store.replace_history("BTC", &new_set).await.unwrap();

        // All-new, nothing from the old batch left behind.
        let stored = store.history_for_symbol("BTC").await.unwrap();
        assert_eq!(stored, new_set);
    }

    #[tokio::test]
    async fn replace_leaves_other_symbols_untouched() {
        let (store, _dir) = test_store().await;

        store
            .replace_history("ETH", &[point("ETH", (2025, 1, 1), 3300.0)])
            .await
            .unwrap();
        store
            .replace_history("BTC", &[point("BTC", (2025, 1, 1), 94000.0)])
            .await
            .unwrap();

        assert_eq!(store.history_count("ETH").await.unwrap(), 1);
        assert_eq!(store.history_count("BTC").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn preference_crud_roundtrip() {
        let (store, _dir) = test_store().await;

        store.add_preference("alice", "BTC").await.unwrap();
        store.add_preference("alice", "ETH").await.unwrap();
        store.add_preference("bob", "DOGE").await.unwrap();

        let prefs = store.preferences_for_user("alice").await.unwrap();
        let symbols: Vec<_> = prefs.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH"]);

        assert!(store.remove_preference("alice", "BTC").await.unwrap());
        assert!(!store.remove_preference("alice", "BTC").await.unwrap());
        assert_eq!(store.preferences_for_user("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stats_count_across_tables() {
        let (store, _dir) = test_store().await;

        store
            .replace_history(
                "BTC",
                &[
                    point("BTC", (2025, 1, 1), 94000.0),
                    point("BTC", (2025, 1, 2), 95000.0),
                ],
            )
            .await
            .unwrap();
        store
            .replace_history("ETH", &[point("ETH", (2025, 1, 1), 3300.0)])
            .await
            .unwrap();
        store.add_preference("alice", "BTC").await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.history_records, 3);
        assert_eq!(stats.history_symbols, 2);
        assert_eq!(stats.preference_count, 1);
        assert_eq!(stats.cached_markets, 0);
    }
}
