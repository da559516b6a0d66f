//! Error types for the fazendas library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when validating, querying or loading farm data.
#[derive(Error, Debug)]
pub enum FarmError {
    /// Error returned by the spatial database.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error when reading files or spawning the import tool.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Coordinates are outside the WGS84 range.
    #[error("Coordinates out of bounds: lat={lat}, lon={lon} (valid: lat ±90°, lon ±180°)")]
    InvalidCoordinates { lat: f64, lon: f64 },

    /// Search radius is not in (0, 1000] kilometres.
    #[error("Invalid radius: {radius_km} km (must be greater than 0 and at most 1000)")]
    InvalidRadius { radius_km: f64 },

    /// Page or page size out of range.
    #[error("Invalid pagination: {reason}")]
    InvalidPagination { reason: String },

    /// Area filter bounds are negative or inverted.
    #[error("Invalid area filter: {reason}")]
    InvalidAreaRange { reason: String },

    /// An SQL identifier coming from configuration is not a plain name.
    #[error("Invalid identifier: {name}")]
    InvalidIdentifier { name: String },

    /// The database returned geometry text that is not valid GeoJSON.
    #[error("Invalid GeoJSON geometry: {0}")]
    InvalidGeoJson(String),

    /// A configuration value could not be parsed.
    #[error("Invalid configuration for {key}: {value:?}")]
    Config { key: &'static str, value: String },

    /// The shapefile to import does not exist.
    #[error("Shapefile not found: {path}")]
    ShapefileNotFound { path: PathBuf },

    /// The database did not accept connections within the retry budget.
    #[error("Database not ready after {attempts} attempts")]
    DatabaseUnavailable { attempts: u32 },

    /// The external import tool exited with a failure status.
    #[error("{program} failed with status {status}: {stderr}")]
    LoaderCommand {
        program: String,
        status: i32,
        stderr: String,
    },
}

impl FarmError {
    /// Whether the error was caused by invalid client input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FarmError::InvalidCoordinates { .. }
                | FarmError::InvalidRadius { .. }
                | FarmError::InvalidPagination { .. }
                | FarmError::InvalidAreaRange { .. }
        )
    }
}

/// Result type alias using [`FarmError`].
pub type Result<T> = std::result::Result<T, FarmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FarmError::InvalidCoordinates {
            lat: 91.0,
            lon: 0.0,
        };
        assert!(err.to_string().contains("91"));

        let err = FarmError::InvalidRadius { radius_km: -10.0 };
        assert!(err.to_string().contains("-10"));

        let err = FarmError::ShapefileNotFound {
            path: PathBuf::from("/seed/data/AREA_IMOVEL_1.shp"),
        };
        assert!(err.to_string().contains("AREA_IMOVEL_1.shp"));

        let err = FarmError::LoaderCommand {
            program: "ogr2ogr".to_string(),
            status: 1,
            stderr: "ERROR 1: unable to open datasource".to_string(),
        };
        assert!(err.to_string().contains("ogr2ogr"));
        assert!(err.to_string().contains("unable to open"));
    }

    #[test]
    fn test_is_validation() {
        assert!(FarmError::InvalidRadius { radius_km: 0.0 }.is_validation());
        assert!(FarmError::InvalidPagination {
            reason: "page must be at least 1".to_string()
        }
        .is_validation());
        assert!(!FarmError::DatabaseUnavailable { attempts: 30 }.is_validation());
        assert!(!FarmError::InvalidGeoJson("eof".to_string()).is_validation());
    }
}
