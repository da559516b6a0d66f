//! Farm records as read from the spatial store.

use geojson::Geometry;
use serde::Serialize;

use crate::error::{FarmError, Result};
use crate::geojson::{is_areal, parse_geometry};

/// A farm (land parcel) with its boundary rendered as GeoJSON.
///
/// Field names follow the columns produced by the shapefile import, so the
/// JSON form matches the registry's own vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Farm {
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
    /// MultiPolygon in EPSG:4326.
    pub geometry: Option<Geometry>,
}

/// Raw row shape; `geometry` holds the output of `ST_AsGeoJSON`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct FarmRow {
    pub ogc_fid: i32,
    pub cod_imovel: Option<String>,
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
    pub geometry: Option<String>,
}

impl TryFrom<FarmRow> for Farm {
    type Error = FarmError;

    fn try_from(row: FarmRow) -> Result<Self> {
        let geometry = row.geometry.as_deref().map(parse_geometry).transpose()?;
        if let Some(geometry) = &geometry {
            if !is_areal(geometry) {
                return Err(FarmError::InvalidGeoJson(format!(
                    "farm {} boundary is a {}, expected Polygon or MultiPolygon",
                    row.ogc_fid,
                    geometry.value.type_name()
                )));
            }
        }

        Ok(Farm {
            ogc_fid: row.ogc_fid,
            cod_imovel: row.cod_imovel,
            num_area: row.num_area,
            municipio: row.municipio,
            cod_estado: row.cod_estado,
            cod_tema: row.cod_tema,
            nom_tema: row.nom_tema,
            mod_fiscal: row.mod_fiscal,
            ind_status: row.ind_status,
            ind_tipo: row.ind_tipo,
            des_condic: row.des_condic,
            dat_criaca: row.dat_criaca,
            dat_atuali: row.dat_atuali,
            geometry,
        })
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of matches before pagination.
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Whether pages after this one hold more matches.
    pub fn has_more(&self) -> bool {
        (self.page as i64) * (self.page_size as i64) < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(geometry: Option<&str>) -> FarmRow {
        FarmRow {
            ogc_fid: 7,
            cod_imovel: Some("SP-3509502-0001".to_string()),
            num_area: Some(42.5),
            municipio: Some("Campinas".to_string()),
            cod_estado: Some("SP".to_string()),
            cod_tema: None,
            nom_tema: None,
            mod_fiscal: Some(1.2),
            ind_status: Some("AT".to_string()),
            ind_tipo: Some("IRU".to_string()),
            des_condic: None,
            dat_criaca: Some("2015-05-06".to_string()),
            dat_atuali: None,
            geometry: geometry.map(str::to_string),
        }
    }

    #[test]
    fn test_farm_from_row_with_geometry() {
        let text = r#"{"type":"MultiPolygon","coordinates":[[[[-47.1,-22.9],[-47.0,-22.9],[-47.0,-22.8],[-47.1,-22.9]]]]}"#;
        let farm = Farm::try_from(row(Some(text))).unwrap();

        assert_eq!(farm.ogc_fid, 7);
        assert_eq!(farm.municipio.as_deref(), Some("Campinas"));
        let geometry = farm.geometry.unwrap();
        assert!(matches!(geometry.value, geojson::Value::MultiPolygon(_)));
    }

    #[test]
    fn test_farm_from_row_without_geometry() {
        let farm = Farm::try_from(row(None)).unwrap();
        assert!(farm.geometry.is_none());
    }

    #[test]
    fn test_farm_from_row_invalid_geometry() {
        let result = Farm::try_from(row(Some("not geojson")));
        assert!(matches!(result, Err(FarmError::InvalidGeoJson(_))));
    }

    #[test]
    fn test_farm_from_row_rejects_point_geometry() {
        let result = Farm::try_from(row(Some(r#"{"type":"Point","coordinates":[0.0,0.0]}"#)));
        match result {
            Err(FarmError::InvalidGeoJson(message)) => assert!(message.contains("Point")),
            other => panic!("expected InvalidGeoJson, got {:?}", other),
        }
    }

    #[test]
    fn test_farm_from_row_accepts_polygon() {
        let text = r#"{"type":"Polygon","coordinates":[[[-47.1,-22.9],[-47.0,-22.9],[-47.0,-22.8],[-47.1,-22.9]]]}"#;
        assert!(Farm::try_from(row(Some(text))).is_ok());
    }

    #[test]
    fn test_page_has_more() {
        let page = Page::<i32> {
            items: vec![],
            total: 25,
            page: 2,
            page_size: 10,
        };
        assert!(page.has_more());

        let last = Page::<i32> { page: 3, ..page };
        assert!(!last.has_more());
    }
}
