//! Catalog Engine - category hierarchy resolution and bulk import
//!
//! # Overview
//!
//! - **Category Store** (`db`): SQLite persistence of category nodes,
//!   sibling uniqueness enforced by the schema, one pooled connection per
//!   session
//! - **Resolver** (`catalog`): find-or-create every level of a category path
//!   and return the leaf id
//! - **Tree** (`catalog::tree`): forest fold, integrity check, level repair
//! - **Import** (`import`): field mapping plus a bounded-concurrency job that
//!   resolves the category paths of many product rows
//!
//! # Layout
//!
//! ```text
//! catalog-engine/src/
//! ├── core/          # configuration
//! ├── db/            # pool, migrations, Category Store
//! ├── catalog/       # resolver, tree fold
//! ├── import/        # field mapping, import job
//! └── utils/         # logging, error re-exports
//! ```

pub mod catalog;
pub mod core;
pub mod db;
pub mod import;
pub mod utils;

// Re-export public types
pub use catalog::{CategoryForest, CategoryPathResolver, IntegrityReport, ResolveError};
pub use crate::core::Config;
pub use db::DbService;
pub use db::repository::{
    CategorySession, CategoryStore, MemoryCategoryStore, RepoError, SqliteCategoryStore,
};
pub use import::ImportJob;
pub use utils::{AppError, AppResult, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load `.env`, read [`Config`] from the environment and start logging
pub fn setup_environment() -> anyhow::Result<Config> {
    let _ = dotenv::dotenv();
    let config = Config::from_env();
    init_logger_with_file(
        &config.log_level,
        config.is_production(),
        config.log_dir.as_deref(),
    )?;
    Ok(config)
}
