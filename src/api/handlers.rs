//! HTTP handlers for REST API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::AppState;
use crate::game::board::TileMeta;

/// Liveness probe.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Static board layout, used by clients to render tiles without hardcoding them.
pub async fn board_meta() -> Json<Vec<TileMeta>> {
    Json(crate::game::board::board_meta())
}

/// Look up a pending or archived trade offer by id.
pub async fn get_trade(
    State(state): State<AppState>,
    Path((lobby_id, trade_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let Some(lobby_arc) = state.registry.get(&lobby_id).await else {
        return (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "lobby_or_game_missing" })));
    };
    let lobby = lobby_arc.lock().await;
    let Some(game) = lobby.game.as_ref() else {
        return (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "lobby_or_game_missing" })));
    };
    match game.find_trade(&trade_id) {
        Some((trade, status)) => {
            (StatusCode::OK, Json(serde_json::json!({ "trade": trade, "status": status })))
        }
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not_found" }))),
    }
}
