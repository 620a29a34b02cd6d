use std::fs;

use anyhow::Context;
use catalog_engine::catalog::check_integrity;
use catalog_engine::import::{parse_mapping_json, parse_rows_json};
use catalog_engine::{
    CategoryPathResolver, CategorySession, CategoryStore, DbService, ImportJob,
    SqliteCategoryStore, setup_environment,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, config, logging)
    let config = setup_environment()?;
    tracing::info!(
        environment = %config.environment,
        database = %config.database_path.display(),
        "Catalog import starting"
    );

    // 2. Inputs
    let import_file = config
        .import_file
        .as_deref()
        .context("IMPORT_FILE is not set")?;
    let mapping_file = config
        .mapping_file
        .as_deref()
        .context("MAPPING_FILE is not set")?;

    let mapping_text = fs::read_to_string(mapping_file)
        .with_context(|| format!("Failed to read mapping {}", mapping_file.display()))?;
    let mapping = parse_mapping_json(&mapping_text, &config.path_delimiter)?;

    let rows_text = fs::read_to_string(import_file)
        .with_context(|| format!("Failed to read import rows {}", import_file.display()))?;
    let rows = parse_rows_json(&rows_text)?;

    // 3. Store and job
    let db = DbService::from_config(&config).await?;
    let store = SqliteCategoryStore::new(db.pool.clone())
        .with_conflict_retry_limit(config.conflict_retry_limit);
    let job = ImportJob::from_config(CategoryPathResolver::new(store.clone()), &mapping, &config)?;

    let report = job.run(rows).await;

    // 4. Integrity of the touched partitions
    let mut session = store.session().await?;
    for axis in job.mapping().axes() {
        let category_type = axis.category_type();
        let categories = session.list_by_type(&category_type).await?;
        let integrity = check_integrity(&categories);
        if integrity.is_clean() {
            tracing::info!(category_type = %category_type, total = integrity.total, "Category tree consistent");
        } else {
            tracing::warn!(
                category_type = %category_type,
                issues = integrity.issue_count(),
                level_mismatches = integrity.level_mismatches.len(),
                orphans = integrity.orphans.len(),
                cycles = integrity.cycles.len(),
                duplicate_siblings = integrity.duplicate_siblings.len(),
                "Category tree has integrity issues"
            );
        }
    }
    drop(session);

    println!("{}", serde_json::to_string_pretty(&report)?);

    db.close().await;
    Ok(())
}
