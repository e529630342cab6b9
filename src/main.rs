use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use ebay_showcase::config::Config;
use ebay_showcase::handlers::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().init();

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!(
        strategy = config.strategy.name(),
        environment = ?config.environment,
        cache = %config.cache_path.display(),
        "starting ebay-showcase"
    );

    let port = config.port;
    let state = Arc::new(AppState::new(config));
    let app = ebay_showcase::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    tracing::info!(port, "listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
