//! Field mapping validation and row extraction

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    CategoryAxis, CategoryPath, DEFAULT_PATH_DELIMITER, FieldMapping, ImportRow, SemanticField,
};

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::with_message(ErrorCode::ImportMappingInvalid, msg)
}

/// Parse a JSON mapping document; `default_delimiter` applies when the
/// document has no `path_delimiter` of its own
pub fn parse_mapping_json(text: &str, default_delimiter: &str) -> AppResult<FieldMapping> {
    let mut document: Value = serde_json::from_str(text)
        .map_err(|e| invalid(format!("Mapping is not valid JSON: {e}")))?;
    if let Value::Object(fields) = &mut document
        && !fields.contains_key("path_delimiter")
    {
        fields.insert("path_delimiter".into(), Value::from(default_delimiter));
    }
    serde_json::from_value(document).map_err(|e| invalid(format!("Invalid mapping: {e}")))
}

/// Where one axis reads its path from
#[derive(Debug, Clone, PartialEq, Eq)]
enum AxisSource {
    /// Headers ordered by level, root first
    Levels(Vec<String>),
    /// One header holding a delimited path string
    Path(String),
}

/// A [`FieldMapping`] checked once per job
///
/// - every semantic slot is fed by at most one header
/// - an axis reads either one path column or level columns, never both
/// - level columns start at 0 and have no gaps
/// - at least one axis is mapped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMapping {
    delimiter: String,
    product_ref: Option<String>,
    axes: BTreeMap<CategoryAxis, AxisSource>,
}

impl CompiledMapping {
    pub fn compile(mapping: &FieldMapping) -> AppResult<Self> {
        let mut slots: HashMap<SemanticField, &str> = HashMap::new();
        let mut headers: Vec<&String> = mapping.columns.keys().collect();
        headers.sort();

        for header in headers {
            if header.trim().is_empty() {
                return Err(invalid("Mapping contains a blank column header"));
            }
            let field = mapping.columns[header];
            if let Some(previous) = slots.insert(field, header) {
                return Err(invalid(format!(
                    "Columns '{previous}' and '{header}' both map to {field:?}"
                ))
                .with_detail("columns", vec![previous.to_string(), header.clone()]));
            }
        }

        let product_ref = slots
            .get(&SemanticField::ProductRef)
            .map(|h| h.to_string());

        let mut axes = BTreeMap::new();
        for axis in CategoryAxis::ALL {
            let path_field = match axis {
                CategoryAxis::Vendor => SemanticField::VendorPath,
                CategoryAxis::Store => SemanticField::StorePath,
            };
            let mut levels: Vec<(u8, &str)> = slots
                .iter()
                .filter(|(field, _)| field.axis() == Some(axis))
                .filter_map(|(field, header)| match field {
                    SemanticField::VendorLevel(n) | SemanticField::StoreLevel(n) => {
                        Some((*n, *header))
                    }
                    _ => None,
                })
                .collect();
            levels.sort_unstable();

            let source = match (slots.get(&path_field), levels.is_empty()) {
                (Some(_), false) => {
                    return Err(invalid(format!(
                        "{axis:?} axis maps both a path column and level columns"
                    )));
                }
                (Some(header), true) => AxisSource::Path(header.to_string()),
                (None, false) => {
                    for (expected, (level, header)) in levels.iter().enumerate() {
                        if usize::from(*level) != expected {
                            return Err(invalid(format!(
                                "{axis:?} level columns skip level {expected} (column '{header}' is level {level})"
                            )));
                        }
                    }
                    AxisSource::Levels(levels.into_iter().map(|(_, h)| h.to_string()).collect())
                }
                (None, true) => continue,
            };
            axes.insert(axis, source);
        }

        if axes.is_empty() {
            return Err(invalid("Mapping does not map any category column"));
        }
        let uses_path = axes.values().any(|s| matches!(s, AxisSource::Path(_)));
        if uses_path && mapping.path_delimiter.is_empty() {
            return Err(invalid("Path columns need a non-empty path_delimiter"));
        }

        Ok(Self {
            delimiter: mapping.path_delimiter.clone(),
            product_ref,
            axes,
        })
    }

    /// Parse and compile a JSON mapping document
    pub fn from_json(text: &str) -> AppResult<Self> {
        Self::compile(&parse_mapping_json(text, DEFAULT_PATH_DELIMITER)?)
    }

    /// Mapped axes in a stable order
    pub fn axes(&self) -> impl Iterator<Item = CategoryAxis> + '_ {
        self.axes.keys().copied()
    }

    pub fn product_ref(&self, row: &ImportRow) -> Option<String> {
        let header = self.product_ref.as_ref()?;
        row.fields
            .get(header)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Path of `axis` in `row`; `None` when the axis is not mapped.
    /// Missing cells read as blank, so a mapped axis may yield an empty path.
    pub fn path(&self, axis: CategoryAxis, row: &ImportRow) -> Option<CategoryPath> {
        let cell = |header: &String| row.fields.get(header).map(String::as_str).unwrap_or("");
        Some(match self.axes.get(&axis)? {
            AxisSource::Levels(headers) => CategoryPath::new(headers.iter().map(cell)),
            AxisSource::Path(header) => CategoryPath::parse(cell(header), &self.delimiter),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(columns: &[(&str, SemanticField)]) -> FieldMapping {
        FieldMapping {
            path_delimiter: ">".into(),
            columns: columns.iter().map(|(h, f)| (h.to_string(), *f)).collect(),
        }
    }

    fn row(cells: &[(&str, &str)]) -> ImportRow {
        ImportRow {
            line: 1,
            fields: cells
                .iter()
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_level_columns_extract_in_order() {
        let compiled = CompiledMapping::compile(&mapping(&[
            ("SKU", SemanticField::ProductRef),
            ("Sub Category", SemanticField::VendorLevel(1)),
            ("Category", SemanticField::VendorLevel(0)),
            ("Sub Sub Category", SemanticField::VendorLevel(2)),
        ]))
        .unwrap();
        assert_eq!(compiled.axes().collect::<Vec<_>>(), vec![CategoryAxis::Vendor]);

        let r = row(&[
            ("SKU", " P-1 "),
            ("Category", "Electronics"),
            ("Sub Category", ""),
            ("Sub Sub Category", "Laptops"),
        ]);
        assert_eq!(compiled.product_ref(&r), Some("P-1".into()));
        assert_eq!(
            compiled.path(CategoryAxis::Vendor, &r).unwrap().levels(),
            ["Electronics", "Laptops"]
        );
        assert!(compiled.path(CategoryAxis::Store, &r).is_none());
    }

    #[test]
    fn test_path_column_uses_delimiter() {
        let mut m = mapping(&[("Store Category", SemanticField::StorePath)]);
        m.path_delimiter = "/".into();
        let compiled = CompiledMapping::compile(&m).unwrap();
        let path = compiled
            .path(CategoryAxis::Store, &row(&[("Store Category", "Home/Kitchen")]))
            .unwrap();
        assert_eq!(path.levels(), ["Home", "Kitchen"]);

        // Missing cell reads as an empty path, not as an unmapped axis
        let empty = compiled.path(CategoryAxis::Store, &row(&[])).unwrap();
        assert!(empty.is_empty());
        assert_eq!(compiled.product_ref(&row(&[])), None);
    }

    #[test]
    fn test_rejects_duplicate_slot() {
        let err = CompiledMapping::compile(&mapping(&[
            ("Category", SemanticField::VendorLevel(0)),
            ("Main Category", SemanticField::VendorLevel(0)),
        ]))
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ImportMappingInvalid);
    }

    #[test]
    fn test_level_columns_stay_on_their_axis() {
        let compiled = CompiledMapping::compile(&mapping(&[
            ("Vendor Root", SemanticField::VendorLevel(0)),
            ("Store Root", SemanticField::StoreLevel(0)),
            ("Store Sub", SemanticField::StoreLevel(1)),
        ]))
        .unwrap();
        let r = row(&[("Vendor Root", "Tools"), ("Store Root", "DIY"), ("Store Sub", "Drills")]);
        assert_eq!(compiled.path(CategoryAxis::Vendor, &r).unwrap().levels(), ["Tools"]);
        assert_eq!(
            compiled.path(CategoryAxis::Store, &r).unwrap().levels(),
            ["DIY", "Drills"]
        );
    }

    #[test]
    fn test_rejects_mixed_path_and_levels() {
        let err = CompiledMapping::compile(&mapping(&[
            ("Category", SemanticField::VendorLevel(0)),
            ("Vendor Path", SemanticField::VendorPath),
        ]))
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ImportMappingInvalid);
    }

    #[test]
    fn test_rejects_level_gap() {
        assert!(
            CompiledMapping::compile(&mapping(&[
                ("Category", SemanticField::StoreLevel(0)),
                ("Deep", SemanticField::StoreLevel(2)),
            ]))
            .is_err()
        );
        assert!(CompiledMapping::compile(&mapping(&[("Sub", SemanticField::StoreLevel(1))])).is_err());
    }

    #[test]
    fn test_rejects_mapping_without_axis() {
        let err = CompiledMapping::compile(&mapping(&[("SKU", SemanticField::ProductRef)]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ImportMappingInvalid);
    }

    #[test]
    fn test_from_json() {
        let compiled = CompiledMapping::from_json(
            r#"{ "columns": {
                "SKU": { "field": "product_ref" },
                "Vendor": { "field": "vendor_path" },
                "Store": { "field": "store_level", "level": 0 }
            } }"#,
        )
        .unwrap();
        assert_eq!(
            compiled.axes().collect::<Vec<_>>(),
            vec![CategoryAxis::Vendor, CategoryAxis::Store]
        );
        assert!(CompiledMapping::from_json("{ not json").is_err());
    }

    #[test]
    fn test_default_delimiter_only_when_absent() {
        let text = r#"{ "columns": { "Vendor": { "field": "vendor_path" } } }"#;
        assert_eq!(parse_mapping_json(text, "/").unwrap().path_delimiter, "/");

        let text = r#"{ "path_delimiter": "|", "columns": {} }"#;
        assert_eq!(parse_mapping_json(text, "/").unwrap().path_delimiter, "|");

        let err = parse_mapping_json(r#"{ "columns": 3 }"#, ">").unwrap_err();
        assert_eq!(err.code, ErrorCode::ImportMappingInvalid);
    }
}
