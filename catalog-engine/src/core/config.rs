use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use shared::models::DEFAULT_PATH_DELIMITER;

/// Engine configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | Working directory (database, logs) |
/// | DATABASE_PATH | {WORK_DIR}/catalog.db | SQLite database file |
/// | DB_MAX_CONNECTIONS | 5 | Pool size |
/// | DB_BUSY_TIMEOUT_MS | 5000 | SQLite busy timeout |
/// | IMPORT_CONCURRENCY | 8 | Rows resolved in parallel |
/// | ROW_TIMEOUT_MS | 10000 | Per-row resolution timeout |
/// | CONFLICT_RETRY_LIMIT | 3 | Re-reads after a sibling conflict (at least 1) |
/// | PATH_DELIMITER | > | Default delimiter for path strings |
/// | LOG_LEVEL | info | Log level |
/// | LOG_DIR | (unset) | Daily rolling log directory |
/// | IMPORT_FILE | (unset) | JSON rows to import |
/// | MAPPING_FILE | (unset) | JSON field mapping |
/// | ENVIRONMENT | development | Runtime environment |
///
/// ```ignore
/// WORK_DIR=/data/catalog IMPORT_FILE=rows.json MAPPING_FILE=mapping.json cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: PathBuf,
    pub database_path: PathBuf,
    pub db_max_connections: u32,
    pub db_busy_timeout_ms: u64,
    pub import_concurrency: usize,
    pub row_timeout_ms: u64,
    pub conflict_retry_limit: u32,
    pub path_delimiter: String,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub import_file: Option<PathBuf>,
    pub mapping_file: Option<PathBuf>,
    /// development | staging | production
    pub environment: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let work_dir = PathBuf::from(std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()));
        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| work_dir.join("catalog.db"));

        Self {
            database_path,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 5),
            db_busy_timeout_ms: env_or("DB_BUSY_TIMEOUT_MS", 5000),
            import_concurrency: env_or("IMPORT_CONCURRENCY", 8usize).max(1),
            row_timeout_ms: env_or("ROW_TIMEOUT_MS", 10_000),
            conflict_retry_limit: env_or("CONFLICT_RETRY_LIMIT", 3u32).max(1),
            path_delimiter: std::env::var("PATH_DELIMITER")
                .unwrap_or_else(|_| DEFAULT_PATH_DELIMITER.into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().map(PathBuf::from),
            import_file: std::env::var("IMPORT_FILE").ok().map(PathBuf::from),
            mapping_file: std::env::var("MAPPING_FILE").ok().map(PathBuf::from),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            work_dir,
        }
    }

    /// Defaults rooted at `work_dir`, ignoring the environment
    ///
    /// Used by tests.
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            database_path: work_dir.join("catalog.db"),
            db_max_connections: 5,
            db_busy_timeout_ms: 5000,
            import_concurrency: 8,
            row_timeout_ms: 10_000,
            conflict_retry_limit: 3,
            path_delimiter: DEFAULT_PATH_DELIMITER.into(),
            log_level: "info".into(),
            log_dir: None,
            import_file: None,
            mapping_file: None,
            environment: "development".into(),
            work_dir,
        }
    }

    pub fn row_timeout(&self) -> Duration {
        Duration::from_millis(self.row_timeout_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.db_busy_timeout_ms)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
