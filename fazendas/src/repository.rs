//! Farm lookups against the spatial store.
//!
//! [`FarmRepository`] is the seam between the HTTP layer and PostGIS;
//! [`PgFarmRepository`] is the production implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::Result;
use crate::geo::{AttributeFilter, Coordinates, Pagination, RadiusSearch};
use crate::model::{Farm, FarmRow, Page};
use crate::query::{FarmQuery, TableName};

/// Read-only access to farm records.
#[async_trait]
pub trait FarmRepository: Send + Sync {
    /// Fetch a farm by identifier.
    async fn get_farm(&self, id: i32) -> Result<Option<Farm>>;

    /// Farms whose boundary covers `point`.
    async fn search_by_point(
        &self,
        point: Coordinates,
        pagination: Pagination,
    ) -> Result<Page<Farm>>;

    /// Farms within the search radius, narrowed by `filter`.
    async fn search_by_radius(
        &self,
        search: RadiusSearch,
        filter: AttributeFilter,
        pagination: Pagination,
    ) -> Result<Page<Farm>>;

    /// Round-trip to the database.
    async fn ping(&self) -> Result<()>;
}

/// [`FarmRepository`] backed by a PostgreSQL/PostGIS connection pool.
#[derive(Debug, Clone)]
pub struct PgFarmRepository {
    pool: PgPool,
    table: TableName,
}

impl PgFarmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table: TableName::default(),
        }
    }

    /// Read from `table` instead of the default `farms`.
    pub fn with_table(mut self, table: TableName) -> Self {
        self.table = table;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_page(&self, query: FarmQuery, pagination: Pagination) -> Result<Page<Farm>> {
        let query = query.table(self.table.clone());

        let total: i64 = query
            .count()
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<FarmRow> = query
            .select_page(&pagination)
            .build_query_as::<FarmRow>()
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(Farm::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total,
            page: pagination.page(),
            page_size: pagination.page_size(),
        })
    }
}

#[async_trait]
impl FarmRepository for PgFarmRepository {
    async fn get_farm(&self, id: i32) -> Result<Option<Farm>> {
        tracing::debug!(farm_id = id, "Fetching farm");

        let row: Option<FarmRow> = FarmQuery::by_id(id)
            .table(self.table.clone())
            .select_one()
            .build_query_as::<FarmRow>()
            .fetch_optional(&self.pool)
            .await?;

        row.map(Farm::try_from).transpose()
    }

    async fn search_by_point(
        &self,
        point: Coordinates,
        pagination: Pagination,
    ) -> Result<Page<Farm>> {
        tracing::debug!(
            lat = point.latitude(),
            lon = point.longitude(),
            "Searching farms containing point"
        );

        let page = self
            .fetch_page(FarmQuery::containing(point), pagination)
            .await?;

        tracing::info!(
            lat = point.latitude(),
            lon = point.longitude(),
            total = page.total,
            "Farms containing point"
        );
        Ok(page)
    }

    async fn search_by_radius(
        &self,
        search: RadiusSearch,
        filter: AttributeFilter,
        pagination: Pagination,
    ) -> Result<Page<Farm>> {
        let center = search.center();
        tracing::debug!(
            lat = center.latitude(),
            lon = center.longitude(),
            radius_km = search.radius_km(),
            name = ?filter.name(),
            min_area = ?filter.min_area(),
            max_area = ?filter.max_area(),
            "Searching farms within radius"
        );

        let page = self
            .fetch_page(FarmQuery::within_radius(search).filter(filter), pagination)
            .await?;

        tracing::info!(
            radius_km = search.radius_km(),
            total = page.total,
            "Farms within radius"
        );
        Ok(page)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
