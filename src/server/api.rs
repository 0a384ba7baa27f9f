use crate::constants::DEFAULT_HISTORY_DAYS;
use crate::error::AppError;
use crate::models::{CoinMarket, HistoryPoint};
use crate::server::AppState;
use crate::services::auth::issue_tokens;
use crate::services::market::{filter_markets, paginate, sort_markets, SortKey};
use crate::utils::format_date;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Query parameters for /coins
#[derive(Debug, Deserialize)]
pub struct CoinsQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Sort key: name (default), price, marketcap, volume
    #[serde(default)]
    pub sort: String,
    /// Case-insensitive substring match on symbol or name
    #[serde(default)]
    pub filter: String,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    20
}

/// Query parameters for /coins/history
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub symbol: String,
    pub days: Option<i64>,
}

/// One row of the /coins/history response; the date is preformatted as a
/// YYYY-MM-DD string for chart rendering.
#[derive(Debug, Serialize)]
pub struct HistoryPointResponse {
    pub date: String,
    pub price: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
}

impl From<&HistoryPoint> for HistoryPointResponse {
    fn from(point: &HistoryPoint) -> Self {
        Self {
            date: format_date(point.date),
            price: point.price,
            market_cap: point.market_cap,
            volume_24h: point.volume_24h,
        }
    }
}

/// Map service errors onto HTTP statuses: unresolvable symbols are the
/// client's problem, exhausted fetches are the upstream's, the rest are ours.
fn error_response(err: AppError) -> Response {
    let status = match &err {
        AppError::SymbolUnresolvable { .. } | AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::FetchExhausted { .. } => StatusCode::BAD_GATEWAY,
        AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string()).into_response()
}

/// GET /coins - latest market listing, filtered, sorted and paginated
pub async fn get_coins_handler(
    State(state): State<AppState>,
    Query(params): Query<CoinsQuery>,
) -> Response {
    debug!(?params, "Received market listing request");

    let markets = match state.client.latest_markets().await {
        Ok(markets) => markets,
        Err(e) => {
            error!(error = %e, "Failed to fetch latest markets");
            return error_response(e);
        }
    };

    let filtered = filter_markets(markets, &params.filter);
    let sorted = sort_markets(filtered, SortKey::parse(&params.sort));
    let paged = paginate(sorted, params.page, params.limit);

    info!(
        page = params.page,
        limit = params.limit,
        returned = paged.len(),
        "Returning market listing"
    );

    // Push the page to live subscribers as well, mirroring the response.
    let _ = state.updates.send(paged.clone());

    Json(paged).into_response()
}

/// GET /coins/history?symbol=BTC&days=30
pub async fn get_history_handler(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Response {
    let symbol = params.symbol.trim();
    if symbol.is_empty() {
        return error_response(AppError::InvalidInput("Symbol is required.".to_string()));
    }

    let days = params.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    if days <= 0 {
        return error_response(AppError::InvalidInput("days must be positive.".to_string()));
    }

    match state.sync.get_history(symbol, days).await {
        Ok(points) => {
            info!(symbol, days, records = points.len(), "Returning history series");
            let body: Vec<HistoryPointResponse> =
                points.iter().map(HistoryPointResponse::from).collect();
            Json(body).into_response()
        }
        Err(e) => {
            warn!(symbol, days, error = %e, "History request failed");
            error_response(e)
        }
    }
}

/// POST /coins/history - replace the stored series for a symbol with a
/// client-supplied batch.
///
/// The series is keyed by the first record's symbol; every record is
/// stored under it, honoring the one-series-per-symbol replace discipline.
pub async fn save_history_handler(
    State(state): State<AppState>,
    Json(points): Json<Vec<HistoryPoint>>,
) -> Response {
    let symbol = match points.first() {
        Some(first) if !first.symbol.trim().is_empty() => first.symbol.trim().to_uppercase(),
        _ => {
            return error_response(AppError::InvalidInput(
                "Historical data is required.".to_string(),
            ))
        }
    };

    let records: Vec<HistoryPoint> = points
        .into_iter()
        .map(|mut point| {
            point.symbol = symbol.clone();
            point
        })
        .collect();

    match state.store.replace_history(&symbol, &records).await {
        Ok(saved) => {
            info!(symbol = %symbol, saved, "History series saved");
            Json(serde_json::json!({ "saved": saved })).into_response()
        }
        Err(e) => {
            error!(symbol = %symbol, error = %e, "Failed to save history series");
            error_response(e)
        }
    }
}

/// POST /coins/cache - save a market snapshot
pub async fn save_cached_coins_handler(
    State(state): State<AppState>,
    Json(coins): Json<Vec<CoinMarket>>,
) -> Response {
    if coins.is_empty() {
        return error_response(AppError::InvalidInput("Crypto data is required.".to_string()));
    }

    match state.store.save_market_snapshot(&coins).await {
        Ok(saved) => {
            info!(saved, "Market snapshot cached");
            Json(serde_json::json!({ "saved": saved })).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to cache market snapshot");
            error_response(e)
        }
    }
}

/// GET /coins/cache - read the cached market snapshot
pub async fn get_cached_coins_handler(State(state): State<AppState>) -> Response {
    match state.store.latest_market_snapshot().await {
        Ok(coins) => Json(coins).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read cached market snapshot");
            error_response(e)
        }
    }
}

/// Watchlist entry payload for POST/DELETE /preferences
#[derive(Debug, Deserialize)]
pub struct PreferenceRequest {
    pub user_id: String,
    pub symbol: String,
}

/// GET /preferences/{user_id}
pub async fn get_preferences_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    match state.store.preferences_for_user(&user_id).await {
        Ok(preferences) => Json(preferences).into_response(),
        Err(e) => {
            error!(user_id, error = %e, "Failed to read preferences");
            error_response(e)
        }
    }
}

/// POST /preferences
pub async fn add_preference_handler(
    State(state): State<AppState>,
    Json(request): Json<PreferenceRequest>,
) -> Response {
    if request.user_id.trim().is_empty() || request.symbol.trim().is_empty() {
        return error_response(AppError::InvalidInput("Invalid preference data.".to_string()));
    }

    match state
        .store
        .add_preference(request.user_id.trim(), &request.symbol.trim().to_uppercase())
        .await
    {
        Ok(id) => Json(serde_json::json!({ "id": id })).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to add preference");
            error_response(e)
        }
    }
}

/// DELETE /preferences
pub async fn remove_preference_handler(
    State(state): State<AppState>,
    Json(request): Json<PreferenceRequest>,
) -> Response {
    if request.user_id.trim().is_empty() || request.symbol.trim().is_empty() {
        return error_response(AppError::InvalidInput("Invalid preference data.".to_string()));
    }

    match state
        .store
        .remove_preference(request.user_id.trim(), &request.symbol.trim().to_uppercase())
        .await
    {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(AppError::NotFound("No such preference.".to_string())),
        Err(e) => {
            error!(error = %e, "Failed to remove preference");
            error_response(e)
        }
    }
}

/// Login payload for POST /auth/login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /auth/login - verify credentials, issue an opaque token pair
pub async fn login_handler(
    State(state): State<AppState>,
    Json(login): Json<LoginRequest>,
) -> Response {
    match state.verifier.verify(&login.username, &login.password) {
        Ok(principal) => {
            info!(username = %principal.username, "Login succeeded");
            Json(issue_tokens(&principal)).into_response()
        }
        Err(e) => {
            warn!(username = %login.username, "Login rejected");
            error_response(e)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub history_records: i64,
    pub history_symbols: i64,
    pub cached_markets: i64,
    pub preference_count: i64,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Response {
    match state.store.stats().await {
        Ok(stats) => Json(HealthResponse {
            status: "ok",
            uptime_secs: state.started_at.elapsed().as_secs(),
            history_records: stats.history_records,
            history_symbols: stats.history_symbols,
            cached_markets: stats.cached_markets,
            preference_count: stats.preference_count,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Health check failed to read store");
            error_response(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::build_router;
    use crate::services::auth::RejectAllVerifier;
    use crate::services::coingecko::CoinGeckoClient;
    use crate::services::database::SqliteStore;
    use crate::services::history_sync::HistorySync;
    use std::sync::Arc;
    use std::time::Instant;
    use tempfile::tempdir;
    use tokio::sync::broadcast;

    /// Serve the full router on an ephemeral port against a temp store.
    /// The upstream client points at a dead address; tests below only
    /// exercise store-backed paths.
    async fn spawn_api() -> (String, Arc<SqliteStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path().join("test.db")).await.unwrap());
        let client = Arc::new(
            CoinGeckoClient::with_base_url("http://127.0.0.1:9".to_string()).unwrap(),
        );
        let sync = Arc::new(HistorySync::new(client.clone(), store.clone()));
        let (updates, _) = broadcast::channel(16);

        let state = AppState {
            store: store.clone(),
            client,
            sync,
            verifier: Arc::new(RejectAllVerifier),
            updates,
            started_at: Instant::now(),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });

        (format!("http://{}", addr), store, dir)
    }

    fn history_body() -> serde_json::Value {
        serde_json::json!([
            {"symbol": "btc", "date": "2025-01-01", "price": 94000.0,
             "market_cap": 1.86e12, "volume_24h": 4.0e10},
            {"symbol": "btc", "date": "2025-01-02", "price": 95000.0,
             "market_cap": 1.88e12, "volume_24h": 3.9e10},
        ])
    }

    #[derive(Debug, serde::Deserialize)]
    struct HistoryRow {
        date: String,
    }

    #[tokio::test]
    async fn posting_a_history_batch_replaces_the_stored_series() {
        let (base, store, _dir) = spawn_api().await;
        let http = reqwest::Client::new();

        let response = http
            .post(format!("{}/coins/history", base))
            .json(&history_body())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        // Stored under the uppercased first symbol, readable right back.
        let stored = store.history_for_symbol("BTC").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].symbol, "BTC");

        let response = http
            .get(format!("{}/coins/history?symbol=BTC&days=2", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Vec<HistoryRow> = response.json().await.unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(body[0].date, "2025-01-01");
    }

    #[tokio::test]
    async fn posting_an_empty_history_batch_is_rejected() {
        let (base, store, _dir) = spawn_api().await;

        let response = reqwest::Client::new()
            .post(format!("{}/coins/history", base))
            .json(&serde_json::json!([]))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        assert_eq!(store.stats().await.unwrap().history_records, 0);
    }
}
