use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fazendas::loader::DEFAULT_SHAPEFILE;
use fazendas::logging::{init_logging, LogFormat, LoggingConfig};
use fazendas::query::{TableName, DEFAULT_TABLE};
use fazendas::Settings;
use std::path::PathBuf;

mod commands;

/// Farm database loader and query tool
#[derive(Parser)]
#[command(name = "fazendas")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// PostgreSQL connection URL for queries (defaults to the POSTGRES_* variables)
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Table holding the imported farms
    #[arg(long, default_value = DEFAULT_TABLE, global = true)]
    table: String,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a farm shapefile into PostGIS and build the indexes
    Seed {
        /// Path to the .shp file
        #[arg(env = "SHAPEFILE_PATH", default_value = DEFAULT_SHAPEFILE)]
        shapefile: PathBuf,

        /// Connection attempts before giving up
        #[arg(long, default_value = "30")]
        max_retries: u32,

        /// Seconds between connection attempts
        #[arg(long, default_value = "2")]
        retry_interval: u64,

        /// Import program to run
        #[arg(long, default_value = "ogr2ogr")]
        ogr2ogr: String,
    },

    /// Create the spatial and attribute indexes on an imported table
    Index,

    /// Show a single farm
    Get {
        /// Farm identifier (ogc_fid)
        id: i32,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Find farms containing a coordinate
    Point {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: u32,

        /// Results per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Find farms within a radius of a coordinate
    Radius {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Search radius in kilometres
        #[arg(short, long)]
        radius_km: f64,

        /// Match against farm code or municipality
        #[arg(long)]
        name: Option<String>,

        /// Minimum area in hectares
        #[arg(long)]
        min_area: Option<f64>,

        /// Maximum area in hectares
        #[arg(long)]
        max_area: Option<f64>,

        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: u32,

        /// Results per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Seed { .. } => "seed",
            Commands::Index => "index",
            Commands::Get { .. } => "get",
            Commands::Point { .. } => "point",
            Commands::Radius { .. } => "radius",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let format = std::env::var("LOG_FORMAT")
        .map(|v| LogFormat::parse(&v))
        .unwrap_or(LogFormat::Text);
    init_logging(
        &LoggingConfig::new(format, format!("fazendas={level},fazendas_cli={level},sqlx=warn"))
            .with_stderr(),
    );

    let mut settings = Settings::from_env().context("Invalid configuration")?;
    if let Some(url) = cli.database_url {
        settings = settings.with_database_url(url);
    }
    let table = TableName::new(&cli.table).context("Invalid --table")?;
    tracing::debug!(
        %table,
        host = %settings.postgres_host,
        database = %settings.postgres_db,
        command = cli.command.name(),
        "Resolved configuration"
    );

    match cli.command {
        Commands::Seed {
            shapefile,
            max_retries,
            retry_interval,
            ogr2ogr,
        } => {
            commands::seed::run(&settings, table, shapefile, max_retries, retry_interval, ogr2ogr)
                .await
        }
        Commands::Index => commands::seed::index(&settings, table).await,
        Commands::Get { id, json } => commands::query::get(&settings, table, id, json).await,
        Commands::Point {
            lat,
            lon,
            page,
            page_size,
            json,
        } => commands::query::point(&settings, table, lat, lon, page, page_size, json).await,
        Commands::Radius {
            lat,
            lon,
            radius_km,
            name,
            min_area,
            max_area,
            page,
            page_size,
            json,
        } => {
            commands::query::radius(
                &settings,
                table,
                commands::query::RadiusArgs {
                    lat,
                    lon,
                    radius_km,
                    name,
                    min_area,
                    max_area,
                    page,
                    page_size,
                },
                json,
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_radius_command() {
        let cli = Cli::try_parse_from([
            "fazendas", "--table", "public.farms", "radius", "--lat", "-23.55", "--lon",
            "-46.63", "-r", "25", "--name", "Campinas",
        ])
        .unwrap();

        assert_eq!(cli.table, "public.farms");
        assert_eq!(cli.command.name(), "radius");
        match cli.command {
            Commands::Radius {
                lat,
                radius_km,
                name,
                page,
                ..
            } => {
                assert_eq!(lat, -23.55);
                assert_eq!(radius_km, 25.0);
                assert_eq!(name.as_deref(), Some("Campinas"));
                assert_eq!(page, 1);
            }
            _ => panic!("expected radius command"),
        }
    }

    #[test]
    fn test_seed_defaults() {
        let cli = Cli::try_parse_from(["fazendas", "seed"]).unwrap();
        assert_eq!(cli.command.name(), "seed");
        assert_eq!(cli.table, DEFAULT_TABLE);
    }
}
