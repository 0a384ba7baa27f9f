use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One dated observation of price, market cap and 24h volume for a symbol.
///
/// Rows are created in bulk when a series is refreshed, read by the history
/// endpoint and deleted in bulk right before a fresh batch for the same
/// symbol is inserted. No row is ever individually updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Uppercased ticker, e.g. "BTC".
    pub symbol: String,
    /// Calendar date (UTC, day granularity).
    pub date: NaiveDate,
    /// Price in USD.
    pub price: f64,
    /// Market cap in USD.
    pub market_cap: f64,
    /// 24-hour volume in USD.
    pub volume_24h: f64,
}
