//! Validated search inputs.
//!
//! Every value that reaches the SQL layer goes through one of these types, so
//! the query builders can assume coordinates, radii and page bounds are sane.
//!
//! ```
//! use fazendas::geo::{Coordinates, RadiusSearch};
//!
//! let center = Coordinates::new(-23.5505, -46.6333).unwrap();
//! let search = RadiusSearch::new(center, 50.0).unwrap();
//! assert_eq!(search.radius_meters(), 50_000.0);
//!
//! assert!(Coordinates::new(91.0, 0.0).is_err());
//! ```

use crate::error::{FarmError, Result};

/// Largest accepted search radius, in kilometres.
pub const MAX_RADIUS_KM: f64 = 1000.0;

/// Largest page size a client may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A WGS84 point (EPSG:4326) in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Create a point, rejecting values outside ±90° latitude / ±180° longitude.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if !valid {
            return Err(FarmError::InvalidCoordinates {
                lat: latitude,
                lon: longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// A point plus a geodesic search radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusSearch {
    center: Coordinates,
    radius_km: f64,
}

impl RadiusSearch {
    /// Create a radius search. The radius must be in `(0, 1000]` km.
    pub fn new(center: Coordinates, radius_km: f64) -> Result<Self> {
        if !(radius_km > 0.0 && radius_km <= MAX_RADIUS_KM) {
            return Err(FarmError::InvalidRadius { radius_km });
        }
        Ok(Self { center, radius_km })
    }

    pub fn center(&self) -> Coordinates {
        self.center
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Radius in metres, the unit `ST_DWithin` uses on geography values.
    pub fn radius_meters(&self) -> f64 {
        self.radius_km * 1000.0
    }
}

/// Optional attribute filters for radius searches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeFilter {
    name: Option<String>,
    min_area: Option<f64>,
    max_area: Option<f64>,
}

impl AttributeFilter {
    /// Build a filter.
    ///
    /// A blank `name` counts as no name filter. Area bounds are hectares and
    /// must be non-negative, with `min_area <= max_area` when both are given.
    pub fn new(name: Option<String>, min_area: Option<f64>, max_area: Option<f64>) -> Result<Self> {
        for (label, bound) in [("min_area", min_area), ("max_area", max_area)] {
            if let Some(value) = bound {
                if !value.is_finite() || value < 0.0 {
                    return Err(FarmError::InvalidAreaRange {
                        reason: format!("{} must be a non-negative number, got {}", label, value),
                    });
                }
            }
        }

        if let (Some(min), Some(max)) = (min_area, max_area) {
            if min > max {
                return Err(FarmError::InvalidAreaRange {
                    reason: format!("min_area ({}) is greater than max_area ({})", min, max),
                });
            }
        }

        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(Self {
            name,
            min_area,
            max_area,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn min_area(&self) -> Option<f64> {
        self.min_area
    }

    pub fn max_area(&self) -> Option<f64> {
        self.max_area
    }

    /// Whether no predicate would be added by this filter.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.min_area.is_none() && self.max_area.is_none()
    }

    /// `ILIKE` pattern for the name filter, with LIKE metacharacters escaped.
    pub fn name_pattern(&self) -> Option<String> {
        self.name.as_deref().map(|name| {
            let mut escaped = String::with_capacity(name.len() + 2);
            escaped.push('%');
            for c in name.chars() {
                if matches!(c, '%' | '_' | '\\') {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped.push('%');
            escaped
        })
    }
}

/// One-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    page_size: u32,
}

impl Pagination {
    /// Validate a page request.
    ///
    /// `page` must be at least 1 and `page_size` within `1..=100`. The page
    /// size is then clamped to `max_page_size`, the server-side ceiling.
    pub fn new(page: u32, page_size: u32, max_page_size: u32) -> Result<Self> {
        if page == 0 {
            return Err(FarmError::InvalidPagination {
                reason: "page must be at least 1".to_string(),
            });
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(FarmError::InvalidPagination {
                reason: format!("page_size must be between 1 and {}", MAX_PAGE_SIZE),
            });
        }

        Ok(Self {
            page,
            page_size: page_size.min(max_page_size.max(1)),
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}
