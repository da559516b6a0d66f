use anyhow::{bail, Context, Result};
use fazendas::geo::MAX_PAGE_SIZE;
use fazendas::query::TableName;
use fazendas::{
    AttributeFilter, Coordinates, Farm, FarmRepository, Page, Pagination, PgFarmRepository,
    RadiusSearch, Settings,
};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

#[derive(Serialize)]
struct FarmListResponse<'a> {
    total: i64,
    page: u32,
    page_size: u32,
    farms: &'a [Farm],
}

/// Radius search parameters as given on the command line.
pub struct RadiusArgs {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
    pub name: Option<String>,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub page: u32,
    pub page_size: Option<u32>,
}

async fn connect(settings: &Settings, table: TableName) -> Result<PgFarmRepository> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database_url())
        .await
        .context("Failed to connect to database")?;

    Ok(PgFarmRepository::new(pool).with_table(table))
}

fn pagination(settings: &Settings, page: u32, page_size: Option<u32>) -> Result<Pagination> {
    let page_size = page_size.unwrap_or(settings.default_page_size.clamp(1, MAX_PAGE_SIZE));
    Ok(Pagination::new(page, page_size, settings.max_page_size)?)
}

pub async fn get(settings: &Settings, table: TableName, id: i32, json: bool) -> Result<()> {
    let repository = connect(settings, table).await?;

    let farm = repository
        .get_farm(id)
        .await
        .context("Failed to fetch farm")?;
    repository.pool().close().await;

    let Some(farm) = farm else {
        bail!("Farm {} not found", id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&farm)?);
    } else {
        println!("{}", farm_line(&farm));
    }

    Ok(())
}

pub async fn point(
    settings: &Settings,
    table: TableName,
    lat: f64,
    lon: f64,
    page: u32,
    page_size: Option<u32>,
    json: bool,
) -> Result<()> {
    let point = Coordinates::new(lat, lon)?;
    let pagination = pagination(settings, page, page_size)?;
    let repository = connect(settings, table).await?;

    let result = repository
        .search_by_point(point, pagination)
        .await
        .context("Failed to search farms by point")?;
    repository.pool().close().await;

    print_page(&result, json)
}

pub async fn radius(
    settings: &Settings,
    table: TableName,
    args: RadiusArgs,
    json: bool,
) -> Result<()> {
    let search = RadiusSearch::new(Coordinates::new(args.lat, args.lon)?, args.radius_km)?;
    let filter = AttributeFilter::new(args.name, args.min_area, args.max_area)?;
    let pagination = pagination(settings, args.page, args.page_size)?;
    let repository = connect(settings, table).await?;

    let result = repository
        .search_by_radius(search, filter, pagination)
        .await
        .context("Failed to search farms by radius")?;
    repository.pool().close().await;

    print_page(&result, json)
}

fn print_page(page: &Page<Farm>, json: bool) -> Result<()> {
    if json {
        let response = FarmListResponse {
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            farms: &page.items,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    for farm in &page.items {
        println!("{}", farm_line(farm));
    }
    println!("{}", page_footer(page));

    Ok(())
}

/// One tab-separated line: id, farm code, municipality/state, area.
fn farm_line(farm: &Farm) -> String {
    let place = match (&farm.municipio, &farm.cod_estado) {
        (Some(municipio), Some(estado)) => format!("{}/{}", municipio, estado),
        (Some(municipio), None) => municipio.clone(),
        (None, Some(estado)) => estado.clone(),
        (None, None) => "-".to_string(),
    };
    let area = farm
        .num_area
        .map(|a| format!("{:.2} ha", a))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{}\t{}\t{}\t{}",
        farm.ogc_fid,
        farm.cod_imovel.as_deref().unwrap_or("-"),
        place,
        area
    )
}

fn page_footer(page: &Page<Farm>) -> String {
    let mut footer = format!(
        "{} of {} farms (page {}, page size {})",
        page.items.len(),
        page.total,
        page.page,
        page.page_size
    );
    if page.has_more() {
        footer.push_str(&format!("; next: --page {}", page.page + 1));
    }
    footer
}
