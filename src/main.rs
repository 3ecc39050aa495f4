use std::net::SocketAddr;

use anyhow::Context;
use foodtrucks::{config::Config, init_db, run_app, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("foodtrucks=info,tower_http=info")),
        )
        .init();

    let config = Config::load()?;
    let pool = init_db(&config.database_url).await?;
    let state = AppState::new(pool, &config);

    let address = SocketAddr::new(config.host, config.port);
    info!("Binding to {address}");
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    run_app(listener, state).await
}
