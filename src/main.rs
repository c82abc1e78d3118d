use anyhow::Context;
use dotenvy::dotenv;
use log::info;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use hrserver::api_router::configure_api_routes;
use hrserver::config::AppConfig;
use hrserver::shared::state::AppState;
use hrserver::shared::utils::create_pool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    let pool = create_pool(&config.database_url())?;

    let drive = if config.drive.enabled {
        let aws_config = aws_config::load_from_env().await;
        Some(aws_sdk_s3::Client::new(&aws_config))
    } else {
        None
    };

    let state = Arc::new(AppState::new(pool, config.clone(), drive));

    let app = configure_api_routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("hrserver listening on {addr}");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
