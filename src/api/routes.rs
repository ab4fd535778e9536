//! Route definitions

use axum::{routing::get, Router};

use super::{handlers, AppState};
use crate::ws;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/board_meta", get(handlers::board_meta))
        .route("/trade/:lobby_id/:trade_id", get(handlers::get_trade))
        .route("/ws", get(ws::handler))
}
