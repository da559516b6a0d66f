use anyhow::{Context, Result};
use fazendas::loader::{index_statements, Loader, LoaderConfig, Stage};
use fazendas::query::TableName;
use fazendas::Settings;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

pub async fn run(
    settings: &Settings,
    table: TableName,
    shapefile: PathBuf,
    max_retries: u32,
    retry_interval: u64,
    program: String,
) -> Result<()> {
    let config = LoaderConfig::from_settings(settings, &shapefile)
        .table(table.clone())
        .max_retries(max_retries)
        .retry_interval(Duration::from_secs(retry_interval))
        .program(program);
    let loader = Loader::new(config);

    let pb = spinner()?;
    let result = loader
        .run_with(|stage| pb.set_message(describe(stage)))
        .await;

    match result {
        Ok(report) => {
            pb.finish_with_message("Seed complete");
            println!(
                "Imported {} into table {} in {:.1}s",
                shapefile.display(),
                table,
                report.elapsed_ms as f64 / 1000.0
            );
            if !report.indexes_created {
                eprintln!(
                    "warning: some indexes were not created; run `fazendas index --table {}`",
                    table
                );
            }
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Seed failed");
            Err(e).context("Failed to seed database")
        }
    }
}

/// Create the indexes on an already imported table.
pub async fn index(settings: &Settings, table: TableName) -> Result<()> {
    let loader = Loader::new(
        LoaderConfig::from_settings(settings, fazendas::loader::DEFAULT_SHAPEFILE)
            .table(table.clone()),
    );

    let pb = spinner()?;
    let pool = loader
        .wait_for_db(|attempt| {
            pb.set_message(describe(Stage::WaitingForDatabase {
                attempt,
                max_retries: loader.config().max_retries,
            }))
        })
        .await
        .context("Failed to connect to database")?;

    pb.set_message(describe(Stage::CreatingIndexes));
    let result = loader.create_indexes(&pool).await;
    pool.close().await;

    match result {
        Ok(()) => {
            pb.finish_with_message("Indexes ready");
            for (name, _) in index_statements(&table) {
                println!("{}", name);
            }
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Index creation failed");
            Err(e).context("Failed to create indexes")
        }
    }
}

fn spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn describe(stage: Stage) -> String {
    match stage {
        Stage::CheckingShapefile => "Checking shapefile".to_string(),
        Stage::WaitingForDatabase {
            attempt,
            max_retries,
        } => format!("Waiting for database ({}/{})", attempt, max_retries),
        Stage::EnablingPostgis => "Enabling PostGIS".to_string(),
        Stage::LoadingShapefile => "Importing shapefile with ogr2ogr".to_string(),
        Stage::CreatingIndexes => "Creating indexes".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_waiting_stage() {
        let message = describe(Stage::WaitingForDatabase {
            attempt: 3,
            max_retries: 30,
        });
        assert_eq!(message, "Waiting for database (3/30)");
    }

    #[test]
    fn test_describe_import_stage() {
        assert!(describe(Stage::LoadingShapefile).contains("ogr2ogr"));
    }
}
