use crate::services::coingecko::CoinGeckoClient;
use crate::services::database::SqliteStore;
use crate::services::history_sync::HistorySync;
use crate::utils::{format_date, get_database_path};
use std::sync::Arc;

pub async fn run(symbol: String, days: i64) {
    let symbol = symbol.to_uppercase();

    if days <= 0 {
        eprintln!("❌ days must be positive, got {}", days);
        std::process::exit(1);
    }

    println!("📥 Pulling {} days of history for {}...", days, symbol);

    let store = match SqliteStore::new(get_database_path()).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("❌ Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let client = match CoinGeckoClient::new() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("❌ Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let sync = HistorySync::new(client, store.clone());

    match sync.get_history(&symbol, days).await {
        Ok(points) => {
            println!("✅ {} records stored for {}", points.len(), symbol);
            if let (Some(first), Some(last)) = (points.first(), points.last()) {
                println!("   📅 {} → {}", format_date(first.date), format_date(last.date));
            }
        }
        Err(e) => {
            eprintln!("❌ Pull failed: {}", e);
            std::process::exit(1);
        }
    }

    store.close().await;
}
