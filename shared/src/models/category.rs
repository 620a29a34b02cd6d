//! Category Model

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Category identifier (SQLite INTEGER PRIMARY KEY, never reused)
pub type CategoryId = i64;

/// Default separator for delimited category paths ("Electronics > Laptops")
pub const DEFAULT_PATH_DELIMITER: &str = ">";

/// Type partition of the category forest
///
/// Two categories with the same name and parent under different types are
/// distinct entities; trees of different types never share nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryType {
    /// Vendor-side classification
    Vendor,
    /// Store-side classification
    Store,
    /// Any other partition tag
    Other(CustomTypeTag),
}

/// Tag of an extensible partition, trimmed and lowercased
///
/// Only built by [`CategoryType::from`], so it never spells `vendor` or
/// `store` and always matches what the store reads back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomTypeTag(String);

impl CustomTypeTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl CategoryType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Vendor => "vendor",
            Self::Store => "store",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

impl From<&str> for CategoryType {
    fn from(tag: &str) -> Self {
        let tag = tag.trim().to_lowercase();
        match tag.as_str() {
            "vendor" => Self::Vendor,
            "store" => Self::Store,
            _ => Self::Other(CustomTypeTag(tag)),
        }
    }
}

impl From<String> for CategoryType {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<CategoryType> for String {
    fn from(ty: CategoryType) -> Self {
        ty.as_str().to_string()
    }
}

impl FromStr for CategoryType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category entity
///
/// `level` is a cached depth: 0 for roots, `parent.level + 1` otherwise.
/// It is always derived from `parent_id` and never authoritative on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub category_type: CategoryType,
    pub parent_id: Option<CategoryId>,
    pub level: i32,
    pub is_active: bool,
    pub created_at: i64,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Level a child of this node must carry
    pub fn child_level(&self) -> i32 {
        self.level + 1
    }
}

/// Ordered category levels from root to leaf
///
/// Construction trims every level and drops blank ones: `["A", "", "B"]`
/// is the two-level path `A > B`, not a path ending after `A`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CategoryPath {
    levels: Vec<String>,
}

impl CategoryPath {
    pub fn new<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let levels = levels
            .into_iter()
            .map(|level| level.as_ref().trim().to_string())
            .filter(|level| !level.is_empty())
            .collect();
        Self { levels }
    }

    /// Split a delimited path string, e.g. `"Electronics > Laptops"`
    pub fn parse(text: &str, delimiter: &str) -> Self {
        let delimiter = match delimiter.trim() {
            "" => delimiter,
            trimmed => trimmed,
        };
        if delimiter.is_empty() {
            return Self::new([text]);
        }
        Self::new(text.split(delimiter))
    }

    /// Join the levels with the delimiter surrounded by single spaces
    pub fn render(&self, delimiter: &str) -> String {
        self.levels.join(&format!(" {} ", delimiter.trim()))
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn leaf(&self) -> Option<&str> {
        self.levels.last().map(String::as_str)
    }

    pub fn push(&mut self, level: impl AsRef<str>) {
        let level = level.as_ref().trim();
        if !level.is_empty() {
            self.levels.push(level.to_string());
        }
    }
}

impl From<Vec<String>> for CategoryPath {
    fn from(levels: Vec<String>) -> Self {
        Self::new(levels)
    }
}

impl From<CategoryPath> for Vec<String> {
    fn from(path: CategoryPath) -> Self {
        path.levels
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(DEFAULT_PATH_DELIMITER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_type_tags() {
        assert_eq!(CategoryType::from("vendor"), CategoryType::Vendor);
        assert_eq!(CategoryType::from(" Store "), CategoryType::Store);
        let marketplace = CategoryType::from(" MarketPlace ");
        assert!(matches!(&marketplace, CategoryType::Other(tag) if tag.as_str() == "marketplace"));
        assert_eq!(marketplace, CategoryType::from("marketplace"));
        assert_eq!(marketplace.as_str(), "marketplace");
        assert_eq!(CategoryType::Vendor.to_string(), "vendor");
    }

    #[test]
    fn test_category_type_tag_survives_string_roundtrip() {
        for tag in ["Marketplace", "VENDOR", " store", "Wholesale Partners"] {
            let ty = CategoryType::from(tag);
            assert_eq!(CategoryType::from(String::from(ty.clone())), ty);
        }
        assert_eq!(CategoryType::from("VENDOR"), CategoryType::Vendor);
    }

    #[test]
    fn test_category_type_serde() {
        let json = serde_json::to_string(&CategoryType::Store).unwrap();
        assert_eq!(json, "\"store\"");
        let ty: CategoryType = serde_json::from_str("\"VENDOR\"").unwrap();
        assert_eq!(ty, CategoryType::Vendor);
    }

    #[test]
    fn test_path_skips_blank_levels() {
        let path = CategoryPath::new(["Electronics", "", "  ", " Laptops "]);
        assert_eq!(path.levels(), ["Electronics", "Laptops"]);
        assert_eq!(path.len(), 2);
        assert_eq!(path.leaf(), Some("Laptops"));
    }

    #[test]
    fn test_path_all_blank_is_empty() {
        assert!(CategoryPath::new(["", "  "]).is_empty());
        assert!(CategoryPath::new(Vec::<String>::new()).is_empty());
        assert_eq!(CategoryPath::default().leaf(), None);
    }

    #[test]
    fn test_path_parse_and_render() {
        let path = CategoryPath::parse("Electronics > Smartphones >> Android", ">");
        assert_eq!(path.levels(), ["Electronics", "Smartphones", "Android"]);
        assert_eq!(path.render(">"), "Electronics > Smartphones > Android");
        assert_eq!(path.to_string(), "Electronics > Smartphones > Android");

        let path = CategoryPath::parse("Home/Kitchen/", "/");
        assert_eq!(path.levels(), ["Home", "Kitchen"]);
    }

    #[test]
    fn test_path_parse_whitespace_delimiter() {
        let path = CategoryPath::parse("Home Kitchen", " ");
        assert_eq!(path.levels(), ["Home", "Kitchen"]);
    }

    #[test]
    fn test_path_push_ignores_blank() {
        let mut path = CategoryPath::new(["A"]);
        path.push("  ");
        path.push(" B ");
        assert_eq!(path.levels(), ["A", "B"]);
    }

    #[test]
    fn test_category_serializes_type_field() {
        let cat = Category {
            id: 1,
            name: "Electronics".into(),
            category_type: CategoryType::Vendor,
            parent_id: None,
            level: 0,
            is_active: true,
            created_at: 0,
        };
        let json = serde_json::to_value(&cat).unwrap();
        assert_eq!(json["type"], "vendor");
        assert!(cat.is_root());
        assert_eq!(cat.child_level(), 1);
    }
}
