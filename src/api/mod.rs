//! API module - HTTP handlers and routes

mod handlers;
mod routes;

use std::sync::Arc;

use crate::bot::driver::BotDriver;
use crate::config::Config;
use crate::lobby::LobbyRegistry;
use crate::ws::Hub;

pub use routes::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub registry: Arc<LobbyRegistry>,
    pub bot_driver: Arc<BotDriver>,
    pub config: Config,
}
