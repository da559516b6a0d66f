//! GeoJSON conversion of stored geometries.
//!
//! Geometries never leave the database in binary form: every query selects
//! `ST_AsGeoJSON(geometry)`, and this module turns that text into a typed
//! [`geojson::Geometry`].
//!
//! # Example
//!
//! ```
//! use fazendas::geojson::parse_geometry;
//!
//! let text = r#"{"type":"Polygon","coordinates":[[[-47.1,-22.9],[-47.0,-22.9],[-47.0,-22.8],[-47.1,-22.9]]]}"#;
//! let geometry = parse_geometry(text).unwrap();
//! assert!(fazendas::geojson::is_areal(&geometry));
//! ```

use geojson::{GeoJson, Geometry, Value as GeoJsonValue};

use crate::error::{FarmError, Result};

/// Parse the text produced by `ST_AsGeoJSON` into a geometry.
///
/// # Errors
///
/// Returns [`FarmError::InvalidGeoJson`] if the text is not JSON, or if it
/// is a Feature/FeatureCollection rather than a bare geometry.
pub fn parse_geometry(text: &str) -> Result<Geometry> {
    match text.parse::<GeoJson>() {
        Ok(GeoJson::Geometry(geometry)) => Ok(geometry),
        Ok(_) => Err(FarmError::InvalidGeoJson(
            "expected a geometry object".to_string(),
        )),
        Err(e) => Err(FarmError::InvalidGeoJson(e.to_string())),
    }
}

/// Whether a geometry describes an area (Polygon or MultiPolygon).
///
/// Farm boundaries are imported with `PROMOTE_TO_MULTI`, so stored values
/// are always areal.
pub fn is_areal(geometry: &Geometry) -> bool {
    matches!(
        geometry.value,
        GeoJsonValue::Polygon(_) | GeoJsonValue::MultiPolygon(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multipolygon() {
        let text = r#"{"type":"MultiPolygon","coordinates":[[[[-46.7,-23.6],[-46.6,-23.6],[-46.6,-23.5],[-46.7,-23.6]]]]}"#;
        let geometry = parse_geometry(text).unwrap();

        match &geometry.value {
            GeoJsonValue::MultiPolygon(polygons) => {
                assert_eq!(polygons.len(), 1);
                assert_eq!(polygons[0][0].len(), 4);
                assert_eq!(polygons[0][0][0], vec![-46.7, -23.6]);
            }
            other => panic!("unexpected geometry: {:?}", other),
        }
        assert!(is_areal(&geometry));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_geometry("{\"type\":"),
            Err(FarmError::InvalidGeoJson(_))
        ));
    }

    #[test]
    fn test_parse_rejects_feature() {
        let text = r#"{"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[0.0,0.0]}}"#;
        assert!(parse_geometry(text).is_err());
    }

    #[test]
    fn test_point_is_not_areal() {
        let geometry = Geometry::new(GeoJsonValue::Point(vec![-46.6, -23.5]));
        assert!(!is_areal(&geometry));
    }
}
