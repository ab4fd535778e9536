use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monop_backend::bot::driver::BotDriver;
use monop_backend::lobby::LobbyRegistry;
use monop_backend::{api, config::Config, ws::Hub};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "monop_backend=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let hub = Arc::new(Hub::new());
    let registry = LobbyRegistry::new(hub.clone());
    registry.spawn_background_tasks();
    let bot_driver = Arc::new(BotDriver::new());

    let app_state = api::AppState { hub, registry, bot_driver, config: config.clone() };

    let cors = if config.allowed_origins == "*" {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
    };

    let mut app = Router::new().merge(api::routes());
    if let Some(dir) = &config.serve_static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    let app = app.layer(cors).layer(TraceLayer::new_for_http()).with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
