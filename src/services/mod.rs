pub mod auth;
pub mod coingecko;
pub mod database;
pub mod history_sync;
pub mod market;

pub use auth::{
    issue_tokens, AuthTokens, CredentialVerifier, Principal, RejectAllVerifier,
    StaticCredentialVerifier,
};
pub use coingecko::{CoinGeckoClient, MarketChart};
pub use database::{SqliteStore, StoreStats};
pub use history_sync::HistorySync;
pub use market::{filter_markets, paginate, sort_markets, SortKey};
