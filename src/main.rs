//! Handicraft Storefront - catalog, checkout gating and WhatsApp-confirmed orders

use anyhow::Result;
use handicraft_storefront::{router, AppState, Config, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    match LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref()) {
        LogFormat::Json => tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).init(),
    }

    let config = Config::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    let state = AppState::from_config(&config).await?;
    let app = router(state);

    let addr = std::net::SocketAddr::new(config.host, config.port);
    tracing::info!(%addr, "Handicraft storefront listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
