use crate::services::database::SqliteStore;
use crate::utils::get_database_path;

pub async fn run() {
    let database_path = get_database_path();

    if !database_path.exists() {
        println!("No database found at {}", database_path.display());
        println!("Run `coinwatch pull --symbol BTC` or `coinwatch serve` to create one.");
        return;
    }

    let store = match SqliteStore::new(database_path.clone()).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("❌ Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    match store.stats().await {
        Ok(stats) => {
            println!("📊 coinwatch store status");
            println!("   📁 Database:        {}", database_path.display());
            println!("   📈 History symbols: {}", stats.history_symbols);
            println!("   🗂️  History records: {}", stats.history_records);
            println!("   💰 Cached markets:  {}", stats.cached_markets);
            println!("   ⭐ Preferences:     {}", stats.preference_count);
        }
        Err(e) => {
            eprintln!("❌ Failed to read store: {}", e);
            std::process::exit(1);
        }
    }

    store.close().await;
}
