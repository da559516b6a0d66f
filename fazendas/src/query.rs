//! Spatial SQL composition.
//!
//! [`FarmQuery`] turns a validated search into parameterized PostGIS SQL. The
//! spatial tests themselves run inside the database:
//!
//! | Search | Predicate |
//! |--------|-----------|
//! | by id | `ogc_fid = $1` |
//! | containing a point | `ST_Covers(geometry, point)` |
//! | within a radius | `ST_DWithin(geometry::geography, point::geography, metres)` |
//!
//! Points are built with `ST_SetSRID(ST_MakePoint(lon, lat), 4326)`; note the
//! longitude-first argument order.
//!
//! User input is always bound, never interpolated. The only text spliced into
//! the SQL is the table name, which comes from configuration and is checked
//! by [`TableName::new`].

use std::fmt;

use sqlx::{Postgres, QueryBuilder};

use crate::error::{FarmError, Result};
use crate::geo::{AttributeFilter, Coordinates, Pagination, RadiusSearch};

/// Table created by the shapefile loader.
pub const DEFAULT_TABLE: &str = "farms";

/// SRID of every stored geometry (WGS84).
pub const SRID: i32 = 4326;

/// Attribute columns followed by the GeoJSON rendering of the boundary.
const SELECT_COLUMNS: &str = "ogc_fid, cod_imovel, num_area, municipio, cod_estado, \
     cod_tema, nom_tema, mod_fiscal, ind_status, ind_tipo, des_condic, \
     dat_criaca, dat_atuali, ST_AsGeoJSON(geometry) AS geometry";

/// A table name that is safe to splice into SQL.
///
/// Accepts `name` or `schema.name`, where each part is ASCII letters, digits
/// and underscores and does not start with a digit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: &str) -> Result<Self> {
        let valid_part = |part: &str| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        };

        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() > 2 || !parts.iter().all(|p| valid_part(p)) {
            return Err(FarmError::InvalidIdentifier {
                name: name.to_string(),
            });
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unqualified part of the name, used as a prefix for index names.
    pub fn base_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE.to_string())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The primary condition a farm query selects on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpatialPredicate {
    /// Exact identifier match.
    Id(i32),
    /// Boundary covers the point (points on the edge count as inside).
    Covers(Coordinates),
    /// Boundary comes within the geodesic radius of the centre.
    Within(RadiusSearch),
}

/// A farm search ready to be rendered into SQL.
///
/// # Example
///
/// ```
/// use fazendas::geo::{Coordinates, Pagination};
/// use fazendas::query::FarmQuery;
///
/// let point = Coordinates::new(-23.5505, -46.6333).unwrap();
/// let query = FarmQuery::containing(point);
/// let sql = query.select_page(&Pagination::new(1, 50, 100).unwrap());
///
/// assert!(sql.sql().contains("ST_Covers(geometry, ST_SetSRID(ST_MakePoint($1, $2), 4326))"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FarmQuery {
    table: TableName,
    predicate: SpatialPredicate,
    filter: AttributeFilter,
}

impl FarmQuery {
    fn new(predicate: SpatialPredicate) -> Self {
        Self {
            table: TableName::default(),
            predicate,
            filter: AttributeFilter::default(),
        }
    }

    /// Look up a single farm by `ogc_fid`.
    pub fn by_id(id: i32) -> Self {
        Self::new(SpatialPredicate::Id(id))
    }

    /// Farms whose boundary covers `point`.
    pub fn containing(point: Coordinates) -> Self {
        Self::new(SpatialPredicate::Covers(point))
    }

    /// Farms within `search.radius_meters()` of the centre, measured on the
    /// spheroid.
    pub fn within_radius(search: RadiusSearch) -> Self {
        Self::new(SpatialPredicate::Within(search))
    }

    /// Query a table other than [`DEFAULT_TABLE`].
    pub fn table(mut self, table: TableName) -> Self {
        self.table = table;
        self
    }

    /// Narrow the query with attribute filters.
    pub fn filter(mut self, filter: AttributeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// `SELECT` one page of matches, ordered by identifier.
    pub fn select_page(&self, pagination: &Pagination) -> QueryBuilder<'static, Postgres> {
        let mut qb = self.select();
        qb.push(" ORDER BY ogc_fid LIMIT ");
        qb.push_bind(pagination.limit());
        qb.push(" OFFSET ");
        qb.push_bind(pagination.offset());
        qb
    }

    /// `SELECT` at most one match.
    pub fn select_one(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = self.select();
        qb.push(" LIMIT 1");
        qb
    }

    /// `SELECT COUNT(*)` over all matches.
    pub fn count(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", self.table));
        self.push_conditions(&mut qb);
        qb
    }

    fn select(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb =
            QueryBuilder::new(format!("SELECT {} FROM {}", SELECT_COLUMNS, self.table));
        self.push_conditions(&mut qb);
        qb
    }

    fn push_conditions(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" WHERE ");

        match self.predicate {
            SpatialPredicate::Id(id) => {
                qb.push("ogc_fid = ");
                qb.push_bind(id);
            }
            SpatialPredicate::Covers(point) => {
                qb.push("ST_Covers(geometry, ");
                push_point(qb, point);
                qb.push(")");
            }
            SpatialPredicate::Within(search) => {
                qb.push("ST_DWithin(geometry::geography, ");
                push_point(qb, search.center());
                qb.push("::geography, ");
                qb.push_bind(search.radius_meters());
                qb.push(")");
            }
        }

        if let Some(pattern) = self.filter.name_pattern() {
            qb.push(" AND (cod_imovel ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR municipio ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }

        if let Some(min_area) = self.filter.min_area() {
            qb.push(" AND num_area >= ");
            qb.push_bind(min_area);
        }

        if let Some(max_area) = self.filter.max_area() {
            qb.push(" AND num_area <= ");
            qb.push_bind(max_area);
        }
    }
}

fn push_point(qb: &mut QueryBuilder<'static, Postgres>, point: Coordinates) {
    qb.push("ST_SetSRID(ST_MakePoint(");
    qb.push_bind(point.longitude());
    qb.push(", ");
    qb.push_bind(point.latitude());
    qb.push(format!("), {})", SRID));
}
