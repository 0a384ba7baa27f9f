use crate::server::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// GET /ws - live market updates
///
/// Every market snapshot broadcast (worker refreshes and /coins responses)
/// is forwarded to connected clients as one JSON array per message.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut updates = state.updates.subscribe();
    info!("WebSocket client connected");

    loop {
        tokio::select! {
            update = updates.recv() => {
                let markets = match update {
                    Ok(markets) => markets,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "WebSocket subscriber lagged, dropping missed updates");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let payload = match serde_json::to_string(&markets) {
                    Ok(payload) => payload,
                    Err(_) => continue,
                };

                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Ignore pings and client chatter.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}
