use crate::error::{AppError, Result};
use crate::models::HistoryPoint;
use crate::services::coingecko::{CoinGeckoClient, MarketChart};
use crate::services::database::SqliteStore;
use chrono::DateTime;
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrates the coin-id resolver and the retrying fetcher to keep one
/// symbol's persisted history series fresh.
///
/// Every call is self-contained: check the store, refresh from upstream when
/// coverage is insufficient, return the freshest series either way. There is
/// no cross-call state and no per-symbol lock; two concurrent refreshes of
/// the same symbol race delete-then-insert and the last writer wins.
pub struct HistorySync {
    client: Arc<CoinGeckoClient>,
    store: Arc<SqliteStore>,
}

impl HistorySync {
    pub fn new(client: Arc<CoinGeckoClient>, store: Arc<SqliteStore>) -> Self {
        Self { client, store }
    }

    /// Return `days` worth of daily history for `symbol`, ascending by date.
    ///
    /// Stored rows are served directly when the symbol already has at least
    /// `days` of them. Fewer rows than requested trigger a full refresh even
    /// when the store simply never held that many days; the threshold is
    /// kept as observed upstream.
    ///
    /// Resolution failure (`SymbolUnresolvable`), fetch exhaustion
    /// (`FetchExhausted`) and storage errors are all terminal for the call:
    /// no partial series is returned and no stale fallback happens past the
    /// initial store check.
    pub async fn get_history(&self, symbol: &str, days: i64) -> Result<Vec<HistoryPoint>> {
        let symbol = symbol.to_uppercase();

        let stored = self.store.history_for_symbol(&symbol).await?;
        if !stored.is_empty() && stored.len() as i64 >= days {
            debug!(symbol = %symbol, rows = stored.len(), "Serving history from store");
            return Ok(stored);
        }

        info!(
            symbol = %symbol,
            stored_rows = stored.len(),
            days,
            "Insufficient stored history, refreshing from upstream"
        );

        let coin_id = self.client.resolve_coin_id(&symbol).await?;
        let chart = self.client.market_chart(&coin_id, days).await?;
        let records = normalize_chart(&symbol, &chart)?;

        self.store.replace_history(&symbol, &records).await?;
        info!(symbol = %symbol, records = records.len(), "History series replaced");

        Ok(records)
    }
}

/// Zip the three parallel series positionally into history points.
///
/// The price series drives the output; the market-cap and volume values are
/// taken at the same index and fall back to 0 when their series is shorter.
/// Index alignment assumes the upstream returns equal-length, co-indexed
/// arrays. Entries landing on the same calendar day collapse keep-last so
/// the stored series has unique, ascending dates.
pub fn normalize_chart(symbol: &str, chart: &MarketChart) -> Result<Vec<HistoryPoint>> {
    let mut records: Vec<HistoryPoint> = Vec::with_capacity(chart.prices.len());

    for (i, (ts_millis, price)) in chart.prices.iter().enumerate() {
        let date = DateTime::from_timestamp_millis(*ts_millis as i64)
            .ok_or_else(|| {
                AppError::Parse(format!("Invalid timestamp in price series: {}", ts_millis))
            })?
            .date_naive();

        let market_cap = chart.market_caps.get(i).map(|(_, v)| *v).unwrap_or(0.0);
        let volume_24h = chart.total_volumes.get(i).map(|(_, v)| *v).unwrap_or(0.0);

        let point = HistoryPoint {
            symbol: symbol.to_string(),
            date,
            price: *price,
            market_cap,
            volume_24h,
        };

        match records.last_mut() {
            Some(last) if last.date == date => *last = point,
            _ => records.push(point),
        }
    }

    Ok(records)
}
