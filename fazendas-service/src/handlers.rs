//! HTTP request handlers for the farm API.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use fazendas::{
    geo::MAX_PAGE_SIZE, AttributeFilter, Coordinates, Farm, FarmError, Page, Pagination,
    RadiusSearch, Settings,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::AppState;

/// Body of a point search.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PointSearchRequest {
    /// Latitude in decimal degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180).
    pub longitude: f64,
}

/// Body of a radius search.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RadiusSearchRequest {
    /// Latitude in decimal degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180).
    pub longitude: f64,
    /// Search radius in kilometres (greater than 0, at most 1000).
    pub raio_km: f64,
}

/// Pagination query parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number, starting at 1.
    pub page: Option<u32>,
    /// Results per page (1 to 100).
    pub page_size: Option<u32>,
}

/// Pagination and filter query parameters for radius searches.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RadiusParams {
    /// Page number, starting at 1.
    pub page: Option<u32>,
    /// Results per page (1 to 100).
    pub page_size: Option<u32>,
    /// Partial, case-insensitive match on registry code or municipality.
    pub name: Option<String>,
    /// Minimum area in hectares.
    pub min_area: Option<f64>,
    /// Maximum area in hectares.
    pub max_area: Option<f64>,
}

/// A farm with its boundary as GeoJSON.
#[derive(Debug, Serialize, ToSchema)]
pub struct FarmResponse {
    pub ogc_fid: i32,
    pub cod_imovel: Option<String>,
    /// Area in hectares.
    pub num_area: Option<f64>,
    pub municipio: Option<String>,
    pub cod_estado: Option<String>,
    pub cod_tema: Option<String>,
    pub nom_tema: Option<String>,
    pub mod_fiscal: Option<f64>,
    pub ind_status: Option<String>,
    pub ind_tipo: Option<String>,
    pub des_condic: Option<String>,
    pub dat_criaca: Option<String>,
    pub dat_atuali: Option<String>,
    /// GeoJSON MultiPolygon (EPSG:4326).
    #[schema(value_type = Option<Object>)]
    pub geometry: Option<geojson::Geometry>,
}

impl From<Farm> for FarmResponse {
    fn from(farm: Farm) -> Self {
        Self {
            ogc_fid: farm.ogc_fid,
            cod_imovel: farm.cod_imovel,
            num_area: farm.num_area,
            municipio: farm.municipio,
            cod_estado: farm.cod_estado,
            cod_tema: farm.cod_tema,
            nom_tema: farm.nom_tema,
            mod_fiscal: farm.mod_fiscal,
            ind_status: farm.ind_status,
            ind_tipo: farm.ind_tipo,
            des_condic: farm.des_condic,
            dat_criaca: farm.dat_criaca,
            dat_atuali: farm.dat_atuali,
            geometry: farm.geometry,
        }
    }
}

/// Paginated list of farms.
#[derive(Debug, Serialize, ToSchema)]
pub struct FarmListResponse {
    /// Matches across all pages.
    pub total: i64,
    pub page: u32,
    /// Effective page size after the server maximum is applied.
    pub page_size: u32,
    pub farms: Vec<FarmResponse>,
}

impl From<Page<Farm>> for FarmListResponse {
    fn from(page: Page<Farm>) -> Self {
        Self {
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            farms: page.items.into_iter().map(FarmResponse::from).collect(),
        }
    }
}

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub detail: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Database connection status.
    pub database: String,
    /// Service version.
    pub version: String,
}

/// API information.
#[derive(Debug, Serialize, ToSchema)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    /// Path of the interactive documentation.
    pub docs: String,
    /// Path of the health check.
    pub health: String,
}

fn pagination(
    settings: &Settings,
    page: Option<u32>,
    page_size: Option<u32>,
) -> Result<Pagination, FarmError> {
    let default_size = settings.default_page_size.clamp(1, MAX_PAGE_SIZE);
    Pagination::new(
        page.unwrap_or(1),
        page_size.unwrap_or(default_size),
        settings.max_page_size,
    )
}

/// API name, version and entry points.
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses((status = 200, description = "API information", body = RootResponse))
)]
pub async fn root(State(state): State<Arc<AppState>>) -> Json<RootResponse> {
    Json(RootResponse {
        name: state.settings.app_name.clone(),
        version: state.settings.app_version.clone(),
        docs: "/docs".to_string(),
        health: "/health".to_string(),
    })
}

/// ReDoc page rendering the OpenAPI document.
pub async fn redoc() -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>MeuAT Fazendas API - ReDoc</title>
<meta charset="utf-8"/>
<meta name="viewport" content="width=device-width, initial-scale=1">
</head>
<body>
<redoc spec-url="{}"></redoc>
<script src="https://cdn.jsdelivr.net/npm/redoc@2/bundles/redoc.standalone.js"></script>
</body>
</html>
"#,
        crate::OPENAPI_PATH
    ))
}

/// Health check endpoint.
///
/// Runs `SELECT 1` against the database.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 503, description = "Database connection failed", body = ErrorResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.repository.ping().await {
        Ok(()) => {
            tracing::debug!("Health check passed");
            (
                StatusCode::OK,
                Json(HealthResponse {
                    status: "healthy".to_string(),
                    database: "connected".to_string(),
                    version: state.settings.app_version.clone(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            ApiError::Unavailable("Database connection failed".to_string()).into_response()
        }
    }
}

/// Get a farm by identifier.
///
/// # Returns
///
/// - `200 OK` with the farm and its GeoJSON boundary
/// - `404 Not Found` if no farm has this identifier
/// - `422 Unprocessable Entity` if the identifier is not an integer
#[utoipa::path(
    get,
    path = "/fazendas/{farm_id}",
    tag = "fazendas",
    params(("farm_id" = i32, Path, description = "Farm identifier (ogc_fid)")),
    responses(
        (status = 200, description = "Farm found", body = FarmResponse),
        (status = 404, description = "Farm not found", body = ErrorResponse),
        (status = 422, description = "Invalid identifier", body = ErrorResponse)
    )
)]
pub async fn get_farm(
    State(state): State<Arc<AppState>>,
    farm_id: Result<Path<i32>, PathRejection>,
) -> Result<Json<FarmResponse>, ApiError> {
    let Path(farm_id) = farm_id?;
    tracing::info!(farm_id, "GET /fazendas/{{farm_id}}");

    match state.repository.get_farm(farm_id).await? {
        Some(farm) => Ok(Json(farm.into())),
        None => {
            tracing::warn!(farm_id, "Farm not found");
            Err(ApiError::NotFound("Farm not found".to_string()))
        }
    }
}

/// Find farms whose boundary contains a point.
///
/// Points on a boundary count as contained.
#[utoipa::path(
    post,
    path = "/fazendas/busca-ponto",
    tag = "fazendas",
    params(PageParams),
    request_body = PointSearchRequest,
    responses(
        (status = 200, description = "Farms containing the point", body = FarmListResponse),
        (status = 422, description = "Invalid coordinates or pagination", body = ErrorResponse)
    )
)]
pub async fn search_by_point(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageParams>, QueryRejection>,
    request: Result<Json<PointSearchRequest>, JsonRejection>,
) -> Result<Json<FarmListResponse>, ApiError> {
    let Query(params) = params?;
    let Json(request) = request?;
    tracing::info!(
        lat = request.latitude,
        lon = request.longitude,
        "POST /fazendas/busca-ponto"
    );

    let point = Coordinates::new(request.latitude, request.longitude)?;
    let pagination = pagination(&state.settings, params.page, params.page_size)?;

    let page = state.repository.search_by_point(point, pagination).await?;
    Ok(Json(page.into()))
}

/// Find farms within a radius of a point.
///
/// Distance is geodesic, in kilometres. Optional filters narrow the result
/// by registry code/municipality and by area.
#[utoipa::path(
    post,
    path = "/fazendas/busca-raio",
    tag = "fazendas",
    params(RadiusParams),
    request_body = RadiusSearchRequest,
    responses(
        (status = 200, description = "Farms within the radius", body = FarmListResponse),
        (status = 422, description = "Invalid coordinates, radius, filters or pagination", body = ErrorResponse)
    )
)]
pub async fn search_by_radius(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RadiusParams>, QueryRejection>,
    request: Result<Json<RadiusSearchRequest>, JsonRejection>,
) -> Result<Json<FarmListResponse>, ApiError> {
    let Query(params) = params?;
    let Json(request) = request?;
    tracing::info!(
        lat = request.latitude,
        lon = request.longitude,
        radius_km = request.raio_km,
        "POST /fazendas/busca-raio"
    );

    let center = Coordinates::new(request.latitude, request.longitude)?;
    let search = RadiusSearch::new(center, request.raio_km)?;
    let filter = AttributeFilter::new(params.name, params.min_area, params.max_area)?;
    let pagination = pagination(&state.settings, params.page, params.page_size)?;

    let page = state
        .repository
        .search_by_radius(search, filter, pagination)
        .await?;
    Ok(Json(page.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_request_deserialize() {
        let json = r#"{"latitude": -23.5505, "longitude": -46.6333}"#;
        let request: PointSearchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.latitude, -23.5505);
        assert_eq!(request.longitude, -46.6333);
    }

    #[test]
    fn test_radius_request_requires_radius() {
        let json = r#"{"latitude": -23.5505, "longitude": -46.6333}"#;
        assert!(serde_json::from_str::<RadiusSearchRequest>(json).is_err());
    }

    #[test]
    fn test_pagination_defaults() {
        let settings = Settings::default();
        let p = pagination(&settings, None, None).unwrap();
        assert_eq!(p.page(), 1);
        assert_eq!(p.page_size(), 50);

        let settings = Settings::default().with_page_sizes(500, 20);
        let p = pagination(&settings, Some(2), None).unwrap();
        assert_eq!(p.page_size(), 20);
    }

    #[test]
    fn test_farm_list_response_serialize() {
        let page = Page {
            items: vec![Farm {
                ogc_fid: 1,
                cod_imovel: Some("SP-1".to_string()),
                num_area: Some(12.0),
                municipio: None,
                cod_estado: Some("SP".to_string()),
                cod_tema: None,
                nom_tema: None,
                mod_fiscal: None,
                ind_status: None,
                ind_tipo: None,
                des_condic: None,
                dat_criaca: None,
                dat_atuali: None,
                geometry: None,
            }],
            total: 1,
            page: 1,
            page_size: 50,
        };
        let json = serde_json::to_value(FarmListResponse::from(page)).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["farms"][0]["ogc_fid"], 1);
        assert_eq!(json["farms"][0]["cod_imovel"], "SP-1");
        assert!(json["farms"][0]["geometry"].is_null());
    }

    #[test]
    fn test_health_response_serialize() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            database: "connected".to_string(),
            version: "0.1.0".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("connected"));
        assert!(json.contains("0.1.0"));
    }
}
