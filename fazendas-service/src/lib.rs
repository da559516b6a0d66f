//! Fazendas Service Library
//!
//! HTTP handlers, router and OpenAPI document for the farm API.
//! This library is used by both the fazendas-service binary and integration tests.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use fazendas::{FarmRepository, Settings};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers.
pub struct AppState {
    /// Farm lookups.
    pub repository: Arc<dyn FarmRepository>,
    /// Settings the service was started with.
    pub settings: Settings,
}

impl AppState {
    pub fn new(repository: Arc<dyn FarmRepository>, settings: Settings) -> Self {
        Self {
            repository,
            settings,
        }
    }
}

/// Where the OpenAPI document is served.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// OpenAPI documentation for the farm API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "MeuAT Fazendas API",
        description = "Farm (land-parcel) search by location, backed by PostGIS.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::root,
        handlers::health_check,
        handlers::get_farm,
        handlers::search_by_point,
        handlers::search_by_radius,
    ),
    components(
        schemas(
            handlers::PointSearchRequest,
            handlers::RadiusSearchRequest,
            handlers::FarmResponse,
            handlers::FarmListResponse,
            handlers::ErrorResponse,
            handlers::HealthResponse,
            handlers::RootResponse,
        )
    ),
    tags(
        (name = "fazendas", description = "Farm query endpoints"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the application router with documentation (Swagger UI at `/docs`,
/// ReDoc at `/redoc`), tracing and CORS.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url(OPENAPI_PATH, ApiDoc::openapi()))
        .route("/redoc", get(handlers::redoc))
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/fazendas/busca-ponto", post(handlers::search_by_point))
        .route("/fazendas/busca-raio", post(handlers::search_by_radius))
        .route("/fazendas/:farm_id", get(handlers::get_farm))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

// Re-export commonly used types for convenience
pub use error::ApiError;
pub use handlers::{
    ErrorResponse, FarmListResponse, FarmResponse, HealthResponse, PointSearchRequest,
    RadiusSearchRequest, RootResponse,
};
