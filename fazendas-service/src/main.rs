//! Fazendas Service - HTTP API for farm parcel queries.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `POSTGRES_HOST` / `POSTGRES_PORT` / `POSTGRES_DB` | Database location | `db` / `5432` / `meuat_fazendas` |
//! | `POSTGRES_USER` / `POSTGRES_PASSWORD` | Database credentials | `postgres` / `postgres` |
//! | `DATABASE_URL` | Full connection URL (overrides the above) | None |
//! | `DB_MAX_CONNECTIONS` | Connection pool size | 10 |
//! | `DEFAULT_PAGE_SIZE` / `MAX_PAGE_SIZE` | Pagination bounds | 50 / 100 |
//! | `FAZENDAS_PORT` | HTTP server port | 8000 |
//! | `DEBUG` | Debug-level logging | false |
//! | `LOG_FORMAT` | `json` or `text` | json |
//! | `RUST_LOG` | Log filter (overrides `DEBUG`) | None |
//!
//! ## Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Health check (includes database)
//! - `GET /fazendas/{farm_id}` - Farm by identifier
//! - `POST /fazendas/busca-ponto` - Farms containing a point
//! - `POST /fazendas/busca-raio` - Farms within a radius
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fazendas::logging::{init_logging, LoggingConfig};
use fazendas::PgFarmRepository;
use fazendas_service::AppState;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = fazendas::settings()?;

    let level = settings.log_level();
    init_logging(&LoggingConfig::from_env(format!(
        "fazendas={level},fazendas_service={level},tower_http={level},sqlx=warn"
    )));

    // Connections are opened on first use, so the API can start before the database.
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(&settings.database_url())?;

    tracing::info!(
        app = %settings.app_name,
        version = %settings.app_version,
        host = %settings.postgres_host,
        database = %settings.postgres_db,
        max_connections = settings.max_connections,
        port = settings.port,
        "Starting fazendas service"
    );

    let state = Arc::new(AppState::new(
        Arc::new(PgFarmRepository::new(pool.clone())),
        settings.clone(),
    ));
    let app = fazendas_service::router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
