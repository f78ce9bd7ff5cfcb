//! Federation demo server binary.

use tracing_subscriber::EnvFilter;

use fed_server::{create_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let bind_addr = format!("{}:{}", config.host, config.port);
    let base_url = config.public_base_url.clone();

    let state = AppState::from_config(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("federation server listening on {bind_addr}, public base {base_url}");

    axum::serve(listener, app).await?;
    Ok(())
}
