//! Catalog Module
//!
//! - [`resolver`] - path resolution (find-or-create each level, return leaf id)
//! - [`tree`] - forest fold, integrity check and level repair

pub mod resolver;
pub mod tree;

pub use resolver::{CategoryPathResolver, ResolveError, ResolveResult};
pub use tree::{
    CategoryForest, DuplicateSiblings, IntegrityReport, LevelDrift, LevelRepair, check_integrity,
    repair_levels,
};
