use crate::server::{self, AppState};
use crate::services::auth::{CredentialVerifier, RejectAllVerifier, StaticCredentialVerifier};
use crate::services::coingecko::CoinGeckoClient;
use crate::services::database::SqliteStore;
use crate::services::history_sync::HistorySync;
use crate::utils::get_database_path;
use crate::worker;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

pub async fn run(port: Option<u16>) {
    let port = port
        .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(9100);

    println!("🚀 Starting coinwatch server on port {}", port);

    let database_path = get_database_path();
    println!("📁 Database: {}", database_path.display());

    let store = match SqliteStore::new(database_path).await {
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

    let verifier: Arc<dyn CredentialVerifier> = match StaticCredentialVerifier::from_env() {
        Ok(verifier) => Arc::new(verifier),
        Err(e) => {
            println!("⚠️  {} - /auth/login will reject all credentials", e);
            Arc::new(RejectAllVerifier)
        }
    };

    let sync = Arc::new(HistorySync::new(client.clone(), store.clone()));
    let (updates_tx, _) = broadcast::channel(16);

    println!("⚙️  Spawning background market worker...");
    let worker_client = client.clone();
    let worker_store = store.clone();
    let worker_updates = updates_tx.clone();
    tokio::spawn(async move {
        worker::run_market_worker(worker_client, worker_store, worker_updates).await;
    });

    let state = AppState {
        store,
        client,
        sync,
        verifier,
        updates: updates_tx,
        started_at: Instant::now(),
    };

    if let Err(e) = server::serve(state, port).await {
        eprintln!("❌ Server error: {}", e);
        std::process::exit(1);
    }
}
