//! COF Dashboard - inventory and invoicing service

use anyhow::Result;
use cof_dashboard::{server, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = Config::from_env()?;
    let port = config.port;
    tracing::info!(data_source = ?config.data_source, api = %config.api_base_url, "configuration loaded");
    let app = server::router(server::AppState::from_config(config)?);

    tracing::info!("🚀 COF Dashboard listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
