use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shortlinks::api;
use shortlinks::clicks::ClickRecorder;
use shortlinks::config::Config;
use shortlinks::redirect;
use shortlinks::shortcode::RandomShortcodeGenerator;
use shortlinks::storage::{SharedStore, ShortLinkStore, StoreSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);
    info!("Loaded configuration");

    // The store lives exactly as long as this process
    let store = SharedStore::new(
        ShortLinkStore::new(
            Box::new(RandomShortcodeGenerator),
            StoreSettings::from(&config.links),
        ),
        ClickRecorder::from(&config.clicks),
    );
    info!(
        default_validity_minutes = config.links.default_validity_minutes,
        max_batch_size = config.links.max_batch_size,
        "In-memory link store ready"
    );

    // Create routers
    let api_router = api::create_api_router(store.clone(), Arc::clone(&config));
    let redirect_router = redirect::create_redirect_router(store, &config);

    // Start API server
    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 API server listening on http://{}", api_addr);
    info!("   - Link endpoints available at http://{}/links", api_addr);

    // Start redirect server
    let redirect_addr = format!(
        "{}:{}",
        config.redirect_server.host, config.redirect_server.port
    );
    let redirect_listener = tokio::net::TcpListener::bind(&redirect_addr).await?;
    info!("🚀 Redirect server listening on http://{}", redirect_addr);
    info!("   - Short URLs look like {}", config.short_url("abc123"));

    // Run both servers until Ctrl+C
    tokio::try_join!(
        axum::serve(api_listener, api_router).with_graceful_shutdown(shutdown_signal()),
        axum::serve(redirect_listener, redirect_router).with_graceful_shutdown(shutdown_signal()),
    )?;

    info!("Servers stopped, discarding in-memory links");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
