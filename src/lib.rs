pub mod authentication;
pub mod config;
mod data_formats;
pub mod db_helpers;
mod errors;
mod handlers;
pub mod ingest;
pub mod models;

use std::{str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
pub use anyhow::Result;
use axum::{
    extract::FromRef,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method, StatusCode,
    },
    routing::{get, post},
    Json, Router,
};
pub use data_formats::*;
pub use errors::{FieldError, RequestError};
use handlers::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use authentication::JwtKeys;
use config::Config;

pub type JsonResponse<T> = (StatusCode, Json<T>);

/// Settings for the ingestion webhook.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Owner of rows created by the webhook.
    pub system_user_id: i64,
    /// When set, callers must send it in `x-api-key`.
    pub api_key: Option<String>,
}

#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: SqlitePool,
    pub keys: Arc<JwtKeys>,
    pub ingest: Arc<IngestSettings>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        AppState {
            pool,
            keys: Arc::new(JwtKeys::new(
                config.jwt_secret.clone(),
                time::Duration::days(config.jwt_expire_days),
            )),
            ingest: Arc::new(IngestSettings {
                system_user_id: config.system_user_id,
                api_key: config.ingest_api_key.clone(),
            }),
        }
    }
}

/// Opens the pool, creating the database file if needed, and runs migrations.
/// In-memory databases get a single connection that is never recycled, since
/// every connection would otherwise see its own empty database.
pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("Invalid DATABASE_URL {db_url}"))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = if db_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };
    let pool = pool_options
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    info!("Running migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    info!("Migrations completed");
    Ok(pool)
}

pub fn make_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
        ])
        .allow_origin(tower_http::cors::Any)
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_current_user))
        .route("/foodtrucks", get(list_trucks).post(create_truck))
        .route(
            "/foodtrucks/:id",
            get(get_truck).put(update_truck).delete(delete_truck),
        )
        .route("/favorites/my-favorites", get(my_favorites))
        .route(
            "/favorites/:truck_id",
            post(add_favorite).delete(remove_favorite),
        )
        .route("/ingest/foodtrucks", post(ingest_trucks))
        .route("/scraper/import", post(import_scraped));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serves until Ctrl+C or SIGTERM, then closes the pool.
pub async fn run_app(listener: TcpListener, state: AppState) -> Result<()> {
    let pool = state.pool.clone();
    let app = make_router(state);

    info!("Server running on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down");
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
