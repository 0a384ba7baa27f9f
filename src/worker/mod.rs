use crate::constants::MARKET_REFRESH_INTERVAL_SECS;
use crate::models::CoinMarket;
use crate::services::coingecko::CoinGeckoClient;
use crate::services::database::SqliteStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Background market worker: periodically refreshes the latest market
/// listing, persists the snapshot and pushes it to live subscribers.
///
/// Fetch failures are logged and the cycle skipped; the worker never exits.
#[instrument(skip_all)]
pub async fn run_market_worker(
    client: Arc<CoinGeckoClient>,
    store: Arc<SqliteStore>,
    updates: broadcast::Sender<Vec<CoinMarket>>,
) {
    info!(
        interval_secs = MARKET_REFRESH_INTERVAL_SECS,
        "Market worker started"
    );

    let mut iteration = 0u64;

    loop {
        iteration += 1;

        match client.latest_markets().await {
            Ok(markets) if markets.is_empty() => {
                warn!(iteration, "Upstream returned an empty market listing");
            }
            Ok(markets) => {
                match store.save_market_snapshot(&markets).await {
                    Ok(saved) => info!(iteration, saved, "Market snapshot refreshed"),
                    Err(e) => error!(iteration, error = %e, "Failed to persist market snapshot"),
                }
                // No subscribers is fine; the send result is irrelevant.
                let _ = updates.send(markets);
            }
            Err(e) => {
                error!(iteration, error = %e, "Market refresh failed, skipping cycle");
            }
        }

        sleep(Duration::from_secs(MARKET_REFRESH_INTERVAL_SECS)).await;
    }
}
