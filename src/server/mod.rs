pub mod api;
pub mod ws;

use crate::models::CoinMarket;
use crate::services::auth::CredentialVerifier;
use crate::services::coingecko::CoinGeckoClient;
use crate::services::database::SqliteStore;
use crate::services::history_sync::HistorySync;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub client: Arc<CoinGeckoClient>,
    pub sync: Arc<HistorySync>,
    pub verifier: Arc<dyn CredentialVerifier>,
    /// Live market updates fanned out to WebSocket subscribers.
    pub updates: broadcast::Sender<Vec<CoinMarket>>,
    pub started_at: Instant,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ])
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/coins", get(api::get_coins_handler))
        .route(
            "/coins/history",
            get(api::get_history_handler).post(api::save_history_handler),
        )
        .route(
            "/coins/cache",
            get(api::get_cached_coins_handler).post(api::save_cached_coins_handler),
        )
        .route("/preferences/{user_id}", get(api::get_preferences_handler))
        .route(
            "/preferences",
            post(api::add_preference_handler).delete(api::remove_preference_handler),
        )
        .route("/auth/login", post(api::login_handler))
        .route("/health", get(api::health_handler))
        .route("/ws", get(ws::ws_handler))
        .layer(cors)
        .with_state(state)
}

/// Start the axum server
pub async fn serve(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Registering routes:");
    tracing::info!("  GET  /coins?page=1&limit=20&sort=marketcap&filter=bit");
    tracing::info!("  GET  /coins/history?symbol=BTC&days=30  POST /coins/history");
    tracing::info!("  GET/POST /coins/cache");
    tracing::info!("  GET  /preferences/{{user_id}}  POST/DELETE /preferences");
    tracing::info!("  POST /auth/login");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /ws (live market updates)");

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
