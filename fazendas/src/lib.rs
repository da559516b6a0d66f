//! # Fazendas - farm parcels over PostGIS
//!
//! Read-only access to farm (land-parcel) records whose boundaries live in a
//! PostgreSQL/PostGIS database, plus the loader that imports them from a
//! shapefile.
//!
//! ## Features
//!
//! - **Lookup by identifier**: one farm with its boundary as GeoJSON
//! - **Point search**: farms whose polygon covers a coordinate
//! - **Radius search**: farms within a geodesic distance of a coordinate,
//!   optionally filtered by name/municipality and area
//! - **Loader**: waits for the database, enables PostGIS, runs `ogr2ogr`,
//!   builds indexes
//!
//! Geometry work (containment, distance, GeoJSON rendering) is done by
//! PostGIS. This crate validates input, composes the SQL and shapes results.
//!
//! ## Quick Start
//!
//! ```ignore
//! use fazendas::{Coordinates, FarmRepository, Pagination, PgFarmRepository, Settings};
//! use sqlx::postgres::PgPoolOptions;
//!
//! let settings = Settings::from_env()?;
//! let pool = PgPoolOptions::new().connect(&settings.database_url()).await?;
//! let repository = PgFarmRepository::new(pool);
//!
//! let point = Coordinates::new(-23.5505, -46.6333)?;
//! let page = repository
//!     .search_by_point(point, Pagination::new(1, 50, settings.max_page_size)?)
//!     .await?;
//! println!("{} farms cover the point", page.total);
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod geojson;
pub mod loader;
pub mod logging;
pub mod model;
pub mod query;
pub mod repository;

// Re-export main types at crate root for convenience
pub use config::{settings, Settings};
pub use error::{FarmError, Result};
pub use geo::{AttributeFilter, Coordinates, Pagination, RadiusSearch};
pub use model::{Farm, Page};
pub use repository::{FarmRepository, PgFarmRepository};
