//! Import Models
//!
//! Declarative mapping from external column headers to semantic slots, the
//! raw rows an import job consumes, and the per-row report it produces.

use super::category::{CategoryId, CategoryType, DEFAULT_PATH_DELIMITER};
use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Classification axis a product carries one leaf category for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryAxis {
    Vendor,
    Store,
}

impl CategoryAxis {
    pub const ALL: [CategoryAxis; 2] = [CategoryAxis::Vendor, CategoryAxis::Store];

    /// Type partition this axis resolves into
    pub fn category_type(&self) -> CategoryType {
        match self {
            Self::Vendor => CategoryType::Vendor,
            Self::Store => CategoryType::Store,
        }
    }
}

/// Semantic slot an external column feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "field", content = "level", rename_all = "snake_case")]
pub enum SemanticField {
    /// Caller-side product reference (SKU, external id), echoed in the report
    ProductRef,
    /// One level of the vendor path, 0 = root
    VendorLevel(u8),
    /// One level of the store path, 0 = root
    StoreLevel(u8),
    /// Whole vendor path as a delimited string
    VendorPath,
    /// Whole store path as a delimited string
    StorePath,
}

impl SemanticField {
    pub fn axis(&self) -> Option<CategoryAxis> {
        match self {
            Self::ProductRef => None,
            Self::VendorLevel(_) | Self::VendorPath => Some(CategoryAxis::Vendor),
            Self::StoreLevel(_) | Self::StorePath => Some(CategoryAxis::Store),
        }
    }
}

fn default_delimiter() -> String {
    DEFAULT_PATH_DELIMITER.to_string()
}

/// External header -> semantic slot, loaded once per import job
///
/// ```json
/// {
///   "path_delimiter": ">",
///   "columns": {
///     "SKU": { "field": "product_ref" },
///     "Category": { "field": "vendor_level", "level": 0 },
///     "Sub Category": { "field": "vendor_level", "level": 1 },
///     "Store Category": { "field": "store_path" }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default = "default_delimiter")]
    pub path_delimiter: String,
    pub columns: HashMap<String, SemanticField>,
}

/// One source row: external header -> raw cell value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    /// 1-based position in the source, used to report failures
    pub line: usize,
    pub fields: HashMap<String, String>,
}

/// Leaf category ids resolved for one product row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategoryAssignment {
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_category_id: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_category_id: Option<CategoryId>,
}

impl ProductCategoryAssignment {
    pub fn set(&mut self, axis: CategoryAxis, id: CategoryId) {
        match axis {
            CategoryAxis::Vendor => self.vendor_category_id = Some(id),
            CategoryAxis::Store => self.store_category_id = Some(id),
        }
    }
}

/// Result of importing one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    Resolved(ProductCategoryAssignment),
    Failed {
        line: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        product_ref: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        axis: Option<CategoryAxis>,
        code: ErrorCode,
        message: String,
        retryable: bool,
    },
}

impl RowOutcome {
    pub fn line(&self) -> usize {
        match self {
            Self::Resolved(assignment) => assignment.line,
            Self::Failed { line, .. } => *line,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Summary of one import batch, rows ordered by line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub total: usize,
    pub resolved: usize,
    pub failed: usize,
    pub retryable: usize,
    pub rows: Vec<RowOutcome>,
}

impl ImportReport {
    pub fn from_outcomes(mut rows: Vec<RowOutcome>) -> Self {
        rows.sort_by_key(RowOutcome::line);
        let resolved = rows.iter().filter(|r| r.is_resolved()).count();
        let retryable = rows
            .iter()
            .filter(|r| matches!(r, RowOutcome::Failed { retryable: true, .. }))
            .count();
        Self {
            total: rows.len(),
            resolved,
            failed: rows.len() - resolved,
            retryable,
            rows,
        }
    }

    /// Lines that failed with a retryable error
    pub fn retry_lines(&self) -> Vec<usize> {
        self.rows
            .iter()
            .filter_map(|r| match r {
                RowOutcome::Failed {
                    line,
                    retryable: true,
                    ..
                } => Some(*line),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_deserialize() {
        let mapping: FieldMapping = serde_json::from_str(
            r#"{
                "columns": {
                    "SKU": { "field": "product_ref" },
                    "Category": { "field": "vendor_level", "level": 0 },
                    "Sub Category": { "field": "vendor_level", "level": 1 },
                    "Store Category": { "field": "store_path" }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(mapping.path_delimiter, ">");
        assert_eq!(mapping.columns["SKU"], SemanticField::ProductRef);
        assert_eq!(mapping.columns["Sub Category"], SemanticField::VendorLevel(1));
        assert_eq!(mapping.columns["Store Category"], SemanticField::StorePath);
    }

    #[test]
    fn test_field_axis() {
        assert_eq!(SemanticField::ProductRef.axis(), None);
        assert_eq!(SemanticField::VendorLevel(3).axis(), Some(CategoryAxis::Vendor));
        assert_eq!(SemanticField::StorePath.axis(), Some(CategoryAxis::Store));
        assert_eq!(CategoryAxis::Store.category_type(), CategoryType::Store);
    }

    #[test]
    fn test_report_counts_and_order() {
        let ok = |line| {
            RowOutcome::Resolved(ProductCategoryAssignment {
                line,
                vendor_category_id: Some(1),
                ..Default::default()
            })
        };
        let failed = |line, code: ErrorCode| RowOutcome::Failed {
            line,
            product_ref: None,
            axis: Some(CategoryAxis::Vendor),
            code,
            message: code.message().to_string(),
            retryable: code.is_retryable(),
        };
        let report = ImportReport::from_outcomes(vec![
            failed(3, ErrorCode::ImportRowTimeout),
            ok(1),
            failed(2, ErrorCode::CategoryPathEmpty),
        ]);
        assert_eq!(report.total, 3);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.retryable, 1);
        assert_eq!(
            report.rows.iter().map(RowOutcome::line).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(report.retry_lines(), vec![3]);
    }

    #[test]
    fn test_outcome_serialize_tagged() {
        let json = serde_json::to_value(RowOutcome::Failed {
            line: 4,
            product_ref: Some("SKU-4".into()),
            axis: None,
            code: ErrorCode::CategoryPathEmpty,
            message: "empty".into(),
            retryable: false,
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["code"], 6104);
        assert!(json.get("axis").is_none());
    }
}
