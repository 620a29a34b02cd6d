//! Bulk Import
//!
//! Resolves the vendor and store category paths of many product rows through
//! one [`CategoryPathResolver`]. Rows run with bounded concurrency, each
//! under its own timeout; a failing row is recorded and never stops the
//! rest of the batch. Products themselves are never touched: the report
//! carries leaf ids for the caller to attach.

pub mod mapping;

pub use mapping::{CompiledMapping, parse_mapping_json};

use std::time::{Duration, Instant};

use futures::StreamExt;
use futures::stream;
use serde_json::Value;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    CategoryAxis, FieldMapping, ImportReport, ImportRow, ProductCategoryAssignment, RowOutcome,
};

use crate::catalog::CategoryPathResolver;
use crate::core::Config;
use crate::db::repository::CategoryStore;

const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_ROW_TIMEOUT: Duration = Duration::from_secs(10);

/// Parse a JSON array of `header -> value` objects into rows numbered from 1.
///
/// Strings are taken as-is, numbers and booleans in their JSON text form,
/// `null` as a missing cell.
pub fn parse_rows_json(text: &str) -> AppResult<Vec<ImportRow>> {
    let records: Vec<serde_json::Map<String, Value>> = serde_json::from_str(text)
        .map_err(|e| {
            AppError::with_message(
                ErrorCode::ImportSourceInvalid,
                format!("Import source must be a JSON array of objects: {e}"),
            )
        })?;

    Ok(records
        .into_iter()
        .enumerate()
        .map(|(i, record)| ImportRow {
            line: i + 1,
            fields: record
                .into_iter()
                .filter_map(|(header, value)| match value {
                    Value::Null => None,
                    Value::String(s) => Some((header, s)),
                    other => Some((header, other.to_string())),
                })
                .collect(),
        })
        .collect())
}

pub struct ImportJob<S> {
    resolver: CategoryPathResolver<S>,
    mapping: CompiledMapping,
    concurrency: usize,
    row_timeout: Duration,
}

impl<S: CategoryStore> ImportJob<S> {
    /// Validate `mapping` once for the whole job
    pub fn new(resolver: CategoryPathResolver<S>, mapping: &FieldMapping) -> AppResult<Self> {
        Ok(Self {
            resolver,
            mapping: CompiledMapping::compile(mapping)?,
            concurrency: DEFAULT_CONCURRENCY,
            row_timeout: DEFAULT_ROW_TIMEOUT,
        })
    }

    pub fn from_config(
        resolver: CategoryPathResolver<S>,
        mapping: &FieldMapping,
        config: &Config,
    ) -> AppResult<Self> {
        Ok(Self::new(resolver, mapping)?
            .with_concurrency(config.import_concurrency)
            .with_row_timeout(config.row_timeout()))
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_row_timeout(mut self, row_timeout: Duration) -> Self {
        self.row_timeout = row_timeout;
        self
    }

    pub fn resolver(&self) -> &CategoryPathResolver<S> {
        &self.resolver
    }

    pub fn mapping(&self) -> &CompiledMapping {
        &self.mapping
    }

    pub async fn run(&self, rows: Vec<ImportRow>) -> ImportReport {
        let started = Instant::now();
        tracing::info!(
            rows = rows.len(),
            concurrency = self.concurrency,
            row_timeout_ms = self.row_timeout.as_millis() as u64,
            "Import started"
        );

        let outcomes: Vec<RowOutcome> = stream::iter(rows)
            .map(|row| self.import_row(row))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let report = ImportReport::from_outcomes(outcomes);
        tracing::info!(
            total = report.total,
            resolved = report.resolved,
            failed = report.failed,
            retryable = report.retryable,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Import finished"
        );
        report
    }

    async fn import_row(&self, row: ImportRow) -> RowOutcome {
        let product_ref = self.mapping.product_ref(&row);

        let (axis, err) =
            match tokio::time::timeout(self.row_timeout, self.resolve_row(&row, product_ref.clone()))
                .await
            {
                Ok(Ok(assignment)) => return RowOutcome::Resolved(assignment),
                Ok(Err((axis, err))) => (Some(axis), err),
                Err(_) => (
                    None,
                    AppError::with_message(
                        ErrorCode::ImportRowTimeout,
                        format!("Row timed out after {} ms", self.row_timeout.as_millis()),
                    ),
                ),
            };

        tracing::warn!(
            line = row.line,
            product_ref = product_ref.as_deref().unwrap_or(""),
            axis = ?axis,
            code = %err.code,
            retryable = err.is_retryable(),
            "Import row failed: {}",
            err.message
        );

        RowOutcome::Failed {
            line: row.line,
            product_ref,
            axis,
            retryable: err.is_retryable(),
            code: err.code,
            message: err.message,
        }
    }

    async fn resolve_row(
        &self,
        row: &ImportRow,
        product_ref: Option<String>,
    ) -> Result<ProductCategoryAssignment, (CategoryAxis, AppError)> {
        let mut assignment = ProductCategoryAssignment {
            line: row.line,
            product_ref,
            ..Default::default()
        };

        for axis in self.mapping.axes() {
            let Some(path) = self.mapping.path(axis, row) else {
                continue;
            };
            let id = self
                .resolver
                .resolve(&path, &axis.category_type())
                .await
                .map_err(|e| (axis, AppError::from(e)))?;
            assignment.set(axis, id);
        }

        Ok(assignment)
    }
}
