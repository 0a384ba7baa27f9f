use crate::constants::{
    COINGECKO_BASE_URL, FETCH_MAX_ATTEMPTS, FETCH_RETRY_DELAY_SECS, HTTP_TIMEOUT_SECS, USER_AGENT,
};
use crate::error::{AppError, Result};
use crate::models::{CoinDirectoryEntry, CoinMarket};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Raw market-chart payload: three parallel series of `[timestampMillis, value]`
/// pairs. The provider returns them co-indexed; alignment is by position,
/// not by timestamp equality.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketChart {
    pub prices: Vec<(f64, f64)>,
    #[serde(default)]
    pub market_caps: Vec<(f64, f64)>,
    #[serde(default)]
    pub total_volumes: Vec<(f64, f64)>,
}

/// Client for the CoinGecko HTTP API.
#[derive(Debug)]
pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl CoinGeckoClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(COINGECKO_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL (tests point this at a
    /// local stub server).
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Invalid base_url: must start with http:// or https://, got: '{}'",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            max_attempts: FETCH_MAX_ATTEMPTS,
            retry_delay: Duration::from_secs(FETCH_RETRY_DELAY_SECS),
        })
    }

    /// Override the retry policy. Tests shorten the delay.
    pub fn with_retry_policy(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_delay = retry_delay;
        self
    }

    /// HTTP GET with bounded retry.
    ///
    /// A 2xx response returns the body immediately. Any transport error or
    /// non-2xx status counts as a failed attempt and is retried blindly
    /// after a fixed delay; there is no backoff and no status-code
    /// discrimination. After `max_attempts` failures the call fails with
    /// `FetchExhausted` and the caller must not retry further.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        for attempt in 1..=self.max_attempts {
            match self.try_fetch(url).await {
                Ok(body) => {
                    debug!(attempt, url, "Upstream fetch succeeded");
                    return Ok(body);
                }
                Err(reason) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        url,
                        reason = %reason,
                        "Upstream fetch attempt failed"
                    );
                }
            }

            if attempt < self.max_attempts {
                sleep(self.retry_delay).await;
            }
        }

        info!(url, attempts = self.max_attempts, "Upstream fetch exhausted all attempts");
        Err(AppError::FetchExhausted {
            attempts: self.max_attempts,
        })
    }

    async fn try_fetch(&self, url: &str) -> std::result::Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?
            .error_for_status()
            .map_err(|e| format!("{}", e))?;

        response
            .text()
            .await
            .map_err(|e| format!("failed to read response body: {}", e))
    }

    /// Fetch the full coin directory. The list is unbounded (no pagination)
    /// and re-fetched on every call; the directory itself is never cached.
    pub async fn coin_directory(&self) -> Result<Vec<CoinDirectoryEntry>> {
        let url = format!("{}/coins/list", self.base_url);
        let body = self.fetch_with_retry(&url).await?;

        serde_json::from_str(&body)
            .map_err(|e| AppError::Parse(format!("Failed to parse coin directory: {}", e)))
    }

    /// Resolve a ticker symbol to the provider's canonical coin id.
    ///
    /// The directory is scanned in provider order and the first
    /// case-insensitive symbol match wins. Symbols are not unique upstream,
    /// so a collision resolves to whichever listing the provider returned
    /// first; there is no tie-break by market cap.
    pub async fn resolve_coin_id(&self, symbol: &str) -> Result<String> {
        let directory = self.coin_directory().await?;

        match directory
            .into_iter()
            .find(|entry| entry.symbol.eq_ignore_ascii_case(symbol))
        {
            Some(entry) => {
                debug!(symbol, coin_id = %entry.id, "Resolved symbol to coin id");
                Ok(entry.id)
            }
            None => Err(AppError::SymbolUnresolvable {
                symbol: symbol.to_string(),
            }),
        }
    }

    /// Fetch the daily market chart for a resolved coin id.
    pub async fn market_chart(&self, coin_id: &str, days: i64) -> Result<MarketChart> {
        let url = format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days={}",
            self.base_url, coin_id, days
        );
        let body = self.fetch_with_retry(&url).await?;

        serde_json::from_str(&body)
            .map_err(|e| AppError::Parse(format!("Failed to parse market chart: {}", e)))
    }

    /// Fetch the latest market listing for all coins. Malformed entries are
    /// logged and skipped rather than failing the whole listing.
    pub async fn latest_markets(&self) -> Result<Vec<CoinMarket>> {
        let url = format!("{}/coins/markets?vs_currency=usd", self.base_url);
        let body = self.fetch_with_retry(&url).await?;

        let items: Vec<Value> = serde_json::from_str(&body)
            .map_err(|e| AppError::Parse(format!("Failed to parse market listing: {}", e)))?;

        let mut markets = Vec::with_capacity(items.len());
        for item in &items {
            match parse_market_entry(item) {
                Ok(market) => markets.push(market),
                Err(e) => warn!(error = %e, "Skipping malformed market entry"),
            }
        }

        Ok(markets)
    }
}

fn parse_market_entry(item: &Value) -> Result<CoinMarket> {
    let symbol = item["symbol"]
        .as_str()
        .ok_or_else(|| AppError::Parse("Missing 'symbol' field".to_string()))?;

    let name = item["name"]
        .as_str()
        .ok_or_else(|| AppError::Parse("Missing 'name' field".to_string()))?;

    let price = item["current_price"]
        .as_f64()
        .ok_or_else(|| AppError::Parse("Missing or invalid 'current_price' field".to_string()))?;

    let market_cap = item["market_cap"]
        .as_f64()
        .ok_or_else(|| AppError::Parse("Missing or invalid 'market_cap' field".to_string()))?;

    let volume_24h = item["total_volume"]
        .as_f64()
        .ok_or_else(|| AppError::Parse("Missing or invalid 'total_volume' field".to_string()))?;

    let updated_at = item["last_updated"]
        .as_str()
        .ok_or_else(|| AppError::Parse("Missing 'last_updated' field".to_string()))
        .and_then(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map_err(|e| AppError::Parse(format!("Failed to parse 'last_updated': {}", e)))
        })?
        .with_timezone(&Utc);

    Ok(CoinMarket {
        symbol: symbol.to_uppercase(),
        name: name.to_string(),
        price,
        market_cap,
        volume_24h,
        updated_at,
    })
}
