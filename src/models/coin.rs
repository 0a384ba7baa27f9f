use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the upstream provider's coin directory (`GET /coins/list`).
///
/// Transient: fetched fresh per resolution, never persisted. Multiple
/// entries may share a symbol; resolution picks the first in provider order.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinDirectoryEntry {
    /// The provider's canonical identifier, e.g. "bitcoin".
    pub id: String,
    pub symbol: String,
    pub name: String,
}

/// Latest market snapshot for one coin (`GET /coins/markets`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    /// Uppercased ticker, e.g. "BTC".
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub updated_at: DateTime<Utc>,
}
