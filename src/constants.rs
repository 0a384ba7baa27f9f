//! Upstream API and synchronization constants.

/// Base URL of the CoinGecko HTTP API.
pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// User-Agent header sent with every upstream request.
pub const USER_AGENT: &str = "coinwatch/0.1";

/// Maximum attempts for one upstream fetch before giving up.
pub const FETCH_MAX_ATTEMPTS: u32 = 3;

/// Fixed delay between fetch attempts. No backoff, no jitter.
pub const FETCH_RETRY_DELAY_SECS: u64 = 2;

/// Number of history days when the caller does not specify one.
pub const DEFAULT_HISTORY_DAYS: i64 = 30;

/// How often the background worker refreshes the market snapshot.
pub const MARKET_REFRESH_INTERVAL_SECS: u64 = 60;

/// Upstream request timeout.
pub const HTTP_TIMEOUT_SECS: u64 = 120;
