//! Shapefile ingestion into PostGIS.
//!
//! The loader is a one-shot job:
//!
//! 1. check that the shapefile exists
//! 2. wait until the database accepts connections
//! 3. enable the `postgis` extension
//! 4. import the shapefile with GDAL's `ogr2ogr`
//! 5. create the spatial and attribute indexes
//!
//! Index creation is best effort: a failure there is logged and reported in
//! [`SeedReport`] but does not fail the seed, since the data is already usable.
//!
//! ```ignore
//! use fazendas::loader::{Loader, LoaderConfig};
//! use fazendas::Settings;
//!
//! let config = LoaderConfig::from_settings(&Settings::from_env()?, "/seed/data/AREA_IMOVEL_1.shp");
//! let report = Loader::new(config).run().await?;
//! println!("indexes created: {}", report.indexes_created);
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tokio::process::Command;

use crate::config::Settings;
use crate::error::{FarmError, Result};
use crate::query::{TableName, SRID};

/// Default location of the shapefile inside the seed container.
pub const DEFAULT_SHAPEFILE: &str = "/seed/data/AREA_IMOVEL_1.shp";

/// Connection and import parameters for the loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub shapefile: PathBuf,
    pub table: TableName,
    /// Connection attempts before giving up.
    pub max_retries: u32,
    /// Pause between connection attempts.
    pub retry_interval: Duration,
    /// Import tool to execute.
    pub program: String,
}

impl LoaderConfig {
    /// Loader parameters using the database settings of the service.
    pub fn from_settings<P: AsRef<Path>>(settings: &Settings, shapefile: P) -> Self {
        Self {
            host: settings.postgres_host.clone(),
            port: settings.postgres_port,
            user: settings.postgres_user.clone(),
            password: settings.postgres_password.clone(),
            database: settings.postgres_db.clone(),
            shapefile: shapefile.as_ref().to_path_buf(),
            table: TableName::default(),
            max_retries: 30,
            retry_interval: Duration::from_secs(2),
            program: "ogr2ogr".to_string(),
        }
    }

    pub fn table(mut self, table: TableName) -> Self {
        self.table = table;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    /// OGR datasource string for the target database.
    ///
    /// With `redact` set, the password is replaced so the string can be logged.
    pub fn pg_datasource(&self, redact: bool) -> String {
        let password = if redact { "***" } else { self.password.as_str() };
        format!(
            "PG:host={} port={} dbname={} user={} password={}",
            self.host, self.port, self.database, self.user, password
        )
    }

    /// Arguments passed to `ogr2ogr`.
    ///
    /// Geometries are promoted to MULTIPOLYGON and reprojected to EPSG:4326.
    /// `PRECISION=NO` keeps large numeric fields from overflowing on import.
    pub fn ogr2ogr_args(&self, redact: bool) -> Vec<String> {
        vec![
            "-f".to_string(),
            "PostgreSQL".to_string(),
            self.pg_datasource(redact),
            self.shapefile.display().to_string(),
            "-nln".to_string(),
            self.table.to_string(),
            "-nlt".to_string(),
            "PROMOTE_TO_MULTI".to_string(),
            "-lco".to_string(),
            "GEOMETRY_NAME=geometry".to_string(),
            "-lco".to_string(),
            "PRECISION=NO".to_string(),
            "-t_srs".to_string(),
            format!("EPSG:{}", SRID),
            "-overwrite".to_string(),
        ]
    }
}

/// Progress notifications emitted by [`Loader::run_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CheckingShapefile,
    WaitingForDatabase { attempt: u32, max_retries: u32 },
    EnablingPostgis,
    LoadingShapefile,
    CreatingIndexes,
}

/// Outcome of a completed seed.
#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    /// Whether every index statement succeeded.
    pub indexes_created: bool,
    /// Total elapsed time in milliseconds.
    pub elapsed_ms: u64,
}

/// An index created after import: `(name, statement)`.
pub fn index_statements(table: &TableName) -> Vec<(String, String)> {
    let base = table.base_name();
    let mut statements = vec![(
        format!("{}_geometry_idx", base),
        format!(
            "CREATE INDEX IF NOT EXISTS {}_geometry_idx ON {} USING GIST (geometry)",
            base, table
        ),
    )];

    for column in ["municipio", "num_area", "cod_imovel"] {
        statements.push((
            format!("{}_{}_idx", base, column),
            format!(
                "CREATE INDEX IF NOT EXISTS {}_{}_idx ON {} ({})",
                base, column, table, column
            ),
        ));
    }

    statements
}

/// Runs the seed steps against one database.
#[derive(Debug, Clone)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Fail early if the shapefile is missing.
    pub fn check_shapefile(&self) -> Result<()> {
        if self.config.shapefile.is_file() {
            Ok(())
        } else {
            Err(FarmError::ShapefileNotFound {
                path: self.config.shapefile.clone(),
            })
        }
    }

    /// Retry connecting until the database answers or retries run out.
    pub async fn wait_for_db(&self, mut on_attempt: impl FnMut(u32)) -> Result<PgPool> {
        let config = &self.config;
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Waiting for database"
        );

        for attempt in 1..=config.max_retries {
            on_attempt(attempt);

            let connect = PgPoolOptions::new()
                .max_connections(2)
                .acquire_timeout(config.retry_interval.max(Duration::from_secs(1)))
                .connect_with(config.connect_options())
                .await;

            match connect {
                Ok(pool) => {
                    tracing::info!(attempt, "Database is ready");
                    return Ok(pool);
                }
                Err(e) => {
                    tracing::info!(
                        attempt,
                        max_retries = config.max_retries,
                        error = %e,
                        "Database not ready yet"
                    );
                    if attempt < config.max_retries {
                        tokio::time::sleep(config.retry_interval).await;
                    }
                }
            }
        }

        tracing::error!(attempts = config.max_retries, "Timed out waiting for database");
        Err(FarmError::DatabaseUnavailable {
            attempts: config.max_retries,
        })
    }

    /// `CREATE EXTENSION IF NOT EXISTS postgis`.
    pub async fn enable_postgis(&self, pool: &PgPool) -> Result<()> {
        tracing::info!("Enabling PostGIS extension");
        sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis")
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Import the shapefile by running `ogr2ogr`.
    pub async fn load_shapefile(&self) -> Result<()> {
        let config = &self.config;
        tracing::info!(
            shapefile = %config.shapefile.display(),
            command = %format!("{} {}", config.program, config.ogr2ogr_args(true).join(" ")),
            "Importing shapefile"
        );

        let output = Command::new(&config.program)
            .args(config.ogr2ogr_args(false))
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(
                status = ?output.status.code(),
                stdout = %String::from_utf8_lossy(&output.stdout).trim(),
                stderr = %stderr,
                "Shapefile import failed"
            );
            return Err(FarmError::LoaderCommand {
                program: config.program.clone(),
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        tracing::debug!(stdout = %String::from_utf8_lossy(&output.stdout).trim(), "ogr2ogr output");
        tracing::info!("Shapefile imported");
        Ok(())
    }

    /// Create the spatial and attribute indexes, stopping at the first failure.
    pub async fn create_indexes(&self, pool: &PgPool) -> Result<()> {
        for (name, statement) in index_statements(&self.config.table) {
            tracing::info!(index = %name, "Creating index");
            sqlx::query(&statement).execute(pool).await?;
        }
        Ok(())
    }

    /// Run the whole seed.
    pub async fn run(&self) -> Result<SeedReport> {
        self.run_with(|_| {}).await
    }

    /// Run the whole seed, reporting each stage to `on_stage`.
    pub async fn run_with(&self, mut on_stage: impl FnMut(Stage)) -> Result<SeedReport> {
        let start = Instant::now();
        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            database = %self.config.database,
            shapefile = %self.config.shapefile.display(),
            "Starting seed"
        );

        on_stage(Stage::CheckingShapefile);
        self.check_shapefile()?;

        let max_retries = self.config.max_retries;
        let pool = self
            .wait_for_db(|attempt| {
                on_stage(Stage::WaitingForDatabase {
                    attempt,
                    max_retries,
                })
            })
            .await?;

        on_stage(Stage::EnablingPostgis);
        self.enable_postgis(&pool).await?;

        on_stage(Stage::LoadingShapefile);
        self.load_shapefile().await?;

        on_stage(Stage::CreatingIndexes);
        let indexes_created = match self.create_indexes(&pool).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Index creation failed, continuing");
                false
            }
        };

        pool.close().await;

        let report = SeedReport {
            indexes_created,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            indexes_created = report.indexes_created,
            elapsed_ms = report.elapsed_ms,
            "Seed complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(shapefile: &Path) -> LoaderConfig {
        LoaderConfig::from_settings(&Settings::default(), shapefile)
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings::default();
        let config = LoaderConfig::from_settings(&settings, DEFAULT_SHAPEFILE);

        assert_eq!(config.host, "db");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "meuat_fazendas");
        assert_eq!(config.max_retries, 30);
        assert_eq!(config.retry_interval, Duration::from_secs(2));
        assert_eq!(config.table.as_str(), "farms");
    }

    #[test]
    fn test_pg_datasource_redaction() {
        let config = config(Path::new(DEFAULT_SHAPEFILE));
        assert_eq!(
            config.pg_datasource(false),
            "PG:host=db port=5432 dbname=meuat_fazendas user=postgres password=postgres"
        );
        assert!(config.pg_datasource(true).ends_with("password=***"));
    }

    #[test]
    fn test_ogr2ogr_args() {
        let config = config(Path::new("/seed/data/AREA_IMOVEL_1.shp"));
        let args = config.ogr2ogr_args(true);

        assert_eq!(
            args,
            vec![
                "-f",
                "PostgreSQL",
                "PG:host=db port=5432 dbname=meuat_fazendas user=postgres password=***",
                "/seed/data/AREA_IMOVEL_1.shp",
                "-nln",
                "farms",
                "-nlt",
                "PROMOTE_TO_MULTI",
                "-lco",
                "GEOMETRY_NAME=geometry",
                "-lco",
                "PRECISION=NO",
                "-t_srs",
                "EPSG:4326",
                "-overwrite",
            ]
        );
    }

    #[test]
    fn test_index_statements() {
        let statements = index_statements(&TableName::default());
        let names: Vec<&str> = statements.iter().map(|(n, _)| n.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "farms_geometry_idx",
                "farms_municipio_idx",
                "farms_num_area_idx",
                "farms_cod_imovel_idx",
            ]
        );
        assert_eq!(
            statements[0].1,
            "CREATE INDEX IF NOT EXISTS farms_geometry_idx ON farms USING GIST (geometry)"
        );
        assert_eq!(
            statements[2].1,
            "CREATE INDEX IF NOT EXISTS farms_num_area_idx ON farms (num_area)"
        );
    }

    #[test]
    fn test_index_statements_schema_qualified() {
        let table = TableName::new("cadastro.imoveis").unwrap();
        let statements = index_statements(&table);
        assert_eq!(
            statements[1].1,
            "CREATE INDEX IF NOT EXISTS imoveis_municipio_idx ON cadastro.imoveis (municipio)"
        );
    }

    #[test]
    fn test_check_shapefile() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("AREA_IMOVEL_1.shp");

        let loader = Loader::new(config(&path));
        assert!(matches!(
            loader.check_shapefile(),
            Err(FarmError::ShapefileNotFound { .. })
        ));

        std::fs::write(&path, b"").unwrap();
        assert!(loader.check_shapefile().is_ok());
    }

    #[test]
    fn test_max_retries_at_least_one() {
        let config = config(Path::new(DEFAULT_SHAPEFILE)).max_retries(0);
        assert_eq!(config.max_retries, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_missing_shapefile() {
        let temp_dir = TempDir::new().unwrap();
        let loader = Loader::new(config(&temp_dir.path().join("missing.shp")));

        let mut stages = Vec::new();
        let result = loader.run_with(|stage| stages.push(stage)).await;

        assert!(matches!(result, Err(FarmError::ShapefileNotFound { .. })));
        assert_eq!(stages, vec![Stage::CheckingShapefile]);
    }

    #[tokio::test]
    async fn test_wait_for_db_gives_up() {
        let mut config = config(Path::new(DEFAULT_SHAPEFILE))
            .max_retries(2)
            .retry_interval(Duration::from_millis(10));
        config.host = "127.0.0.1".to_string();
        config.port = 1;

        let loader = Loader::new(config);
        let mut attempts = Vec::new();
        let result = loader.wait_for_db(|attempt| attempts.push(attempt)).await;

        assert!(matches!(
            result,
            Err(FarmError::DatabaseUnavailable { attempts: 2 })
        ));
        assert_eq!(attempts, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_load_shapefile_missing_program() {
        let loader = Loader::new(
            config(Path::new(DEFAULT_SHAPEFILE)).program("fazendas-no-such-ogr2ogr"),
        );
        assert!(matches!(
            loader.load_shapefile().await,
            Err(FarmError::Io(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_load_shapefile_failing_program() {
        let loader = Loader::new(config(Path::new(DEFAULT_SHAPEFILE)).program("false"));
        match loader.load_shapefile().await {
            Err(FarmError::LoaderCommand {
                program, status, ..
            }) => {
                assert_eq!(program, "false");
                assert_eq!(status, 1);
            }
            other => panic!("expected loader command error, got {:?}", other),
        }
    }
}
