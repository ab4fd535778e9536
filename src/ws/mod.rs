//! WebSocket module for real-time game communication

pub mod hub;

pub use hub::Hub;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use crate::api::AppState;

/// Upgrade the single multiplexed `/ws` endpoint. Lobby membership is
/// negotiated over the socket itself (`auth`, `lobby_join`, ...), not the URL.
pub async fn handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| hub::handle_socket(socket, state))
}
