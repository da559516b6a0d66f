//! API error responses.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fazendas::FarmError;

use crate::handlers::ErrorResponse;

/// Errors returned by the HTTP handlers.
///
/// Every variant renders as `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or out-of-range input (422).
    Validation(String),
    /// No such farm (404).
    NotFound(String),
    /// The database cannot be reached (503).
    Unavailable(String),
    /// Anything else; the cause is logged, not returned (500).
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            ApiError::Validation(detail)
            | ApiError::NotFound(detail)
            | ApiError::Unavailable(detail) => detail.clone(),
            ApiError::Internal => "Internal server error".to_string(),
        }
    }
}

impl From<FarmError> for ApiError {
    fn from(e: FarmError) -> Self {
        if e.is_validation() {
            ApiError::Validation(e.to_string())
        } else {
            tracing::error!(error = %e, "Farm query failed");
            ApiError::Internal
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), detail = %self.detail(), "Request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                detail: self.detail(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_map_to_422() {
        let err: ApiError = FarmError::InvalidCoordinates {
            lat: 91.0,
            lon: 0.0,
        }
        .into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.detail().contains("out of bounds"));
    }

    #[test]
    fn test_internal_errors_hide_cause() {
        let err: ApiError = FarmError::InvalidGeoJson("trailing characters".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail(), "Internal server error");
    }

    #[test]
    fn test_not_found_status() {
        let err = ApiError::NotFound("Farm not found".to_string());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
