//! Category Tree
//!
//! Tree fold over stored category rows: forest building for export, ancestor
//! walks, the integrity check and level repair. Every traversal is iterative
//! with a visited set, so corrupted rows (cycles, dangling parents) are
//! reported instead of looping.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Category, CategoryId, CategoryPath, CategoryType};

use crate::db::repository::{CategorySession, RepoResult};

// =============================================================================
// Forest
// =============================================================================

/// Parent/child index over a set of categories.
///
/// Only same-type parent links become edges. Nodes that cannot be reached
/// from a root (dangling parent, cycle, or below one of those) end up in
/// [`CategoryForest::detached`].
#[derive(Debug, Clone, Default)]
pub struct CategoryForest {
    nodes: HashMap<CategoryId, Category>,
    roots: Vec<CategoryId>,
    children: HashMap<CategoryId, Vec<CategoryId>>,
    preorder: Vec<CategoryId>,
    paths: HashMap<CategoryId, CategoryPath>,
    subtree_sizes: HashMap<CategoryId, usize>,
    detached: Vec<CategoryId>,
}

impl CategoryForest {
    pub fn build(categories: impl IntoIterator<Item = Category>) -> Self {
        let nodes: HashMap<CategoryId, Category> =
            categories.into_iter().map(|c| (c.id, c)).collect();

        let mut ids: Vec<CategoryId> = nodes.keys().copied().collect();
        ids.sort_unstable();

        let mut roots = Vec::new();
        let mut children: HashMap<CategoryId, Vec<CategoryId>> = HashMap::new();
        for id in &ids {
            let node = &nodes[id];
            match node.parent_id {
                None => roots.push(*id),
                Some(pid) => {
                    if let Some(parent) = nodes.get(&pid)
                        && parent.category_type == node.category_type
                    {
                        children.entry(pid).or_default().push(*id);
                    }
                }
            }
        }

        // Depth-first from every root; ids are pushed in reverse so that
        // siblings come out in id order.
        let mut visited: HashSet<CategoryId> = HashSet::with_capacity(nodes.len());
        let mut preorder = Vec::with_capacity(nodes.len());
        let mut paths: HashMap<CategoryId, CategoryPath> = HashMap::with_capacity(nodes.len());
        let mut stack: Vec<(CategoryId, CategoryPath)> = roots
            .iter()
            .rev()
            .map(|id| (*id, CategoryPath::default()))
            .collect();

        while let Some((id, mut path)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = nodes.get(&id) else {
                continue;
            };
            path.push(&node.name);
            if let Some(kids) = children.get(&id) {
                for kid in kids.iter().rev() {
                    if !visited.contains(kid) {
                        stack.push((*kid, path.clone()));
                    }
                }
            }
            preorder.push(id);
            paths.insert(id, path);
        }

        // Children always follow their parent in preorder
        let mut subtree_sizes: HashMap<CategoryId, usize> = HashMap::with_capacity(preorder.len());
        for id in preorder.iter().rev() {
            let below: usize = children
                .get(id)
                .map(|kids| {
                    kids.iter()
                        .filter_map(|kid| subtree_sizes.get(kid))
                        .sum()
                })
                .unwrap_or(0);
            subtree_sizes.insert(*id, below + 1);
        }

        let detached = ids.into_iter().filter(|id| !visited.contains(id)).collect();

        Self {
            nodes,
            roots,
            children,
            preorder,
            paths,
            subtree_sizes,
            detached,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.nodes.get(&id)
    }

    pub fn roots(&self) -> &[CategoryId] {
        &self.roots
    }

    pub fn children(&self, id: CategoryId) -> &[CategoryId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Node count of the subtree rooted at `id`, itself included
    pub fn subtree_size(&self, id: CategoryId) -> Option<usize> {
        self.subtree_sizes.get(&id).copied()
    }

    /// Root-to-node names; `None` for detached nodes
    pub fn path(&self, id: CategoryId) -> Option<&CategoryPath> {
        self.paths.get(&id)
    }

    /// Nodes not reachable from any root
    pub fn detached(&self) -> &[CategoryId] {
        &self.detached
    }

    /// Reachable nodes, parents before children
    pub fn iter_preorder(&self) -> impl Iterator<Item = &Category> {
        self.preorder.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Rendered root-to-node path of every reachable node, in preorder
    pub fn rendered_paths(&self, delimiter: &str) -> Vec<(CategoryId, String)> {
        self.preorder
            .iter()
            .filter_map(|id| self.paths.get(id).map(|p| (*id, p.render(delimiter))))
            .collect()
    }

    /// Ancestors of `id`, nearest first. Stops at a root or a dangling parent.
    pub fn ancestors(&self, id: CategoryId) -> AppResult<Vec<&Category>> {
        let mut current = self.nodes.get(&id).ok_or_else(|| {
            AppError::with_message(ErrorCode::CategoryNotFound, format!("Category {id} not found"))
        })?;

        let mut seen: HashSet<CategoryId> = HashSet::from([id]);
        let mut chain = Vec::new();
        while let Some(pid) = current.parent_id {
            if !seen.insert(pid) {
                return Err(AppError::with_message(
                    ErrorCode::CategoryCycleDetected,
                    format!("Category {id} has a cycle in its ancestry at {pid}"),
                )
                .with_detail("category_id", id)
                .with_detail("cycle_at", pid));
            }
            let Some(parent) = self.nodes.get(&pid) else {
                break;
            };
            chain.push(parent);
            current = parent;
        }
        Ok(chain)
    }
}

// =============================================================================
// Depth walk
// =============================================================================

type DepthWalk = (HashMap<CategoryId, Option<i32>>, Vec<Vec<CategoryId>>);

/// Depth of every node from its root following `parent_id`, plus the cycles
/// met on the way. Nodes with a dangling parent, on a cycle, or below either
/// have no depth.
fn walk_depths(nodes: &HashMap<CategoryId, &Category>) -> DepthWalk {
    let mut ids: Vec<CategoryId> = nodes.keys().copied().collect();
    ids.sort_unstable();

    let mut depths: HashMap<CategoryId, Option<i32>> = HashMap::with_capacity(nodes.len());
    let mut cycles = Vec::new();

    for start in ids {
        if depths.contains_key(&start) {
            continue;
        }

        let mut stack: Vec<CategoryId> = Vec::new();
        let mut on_stack: HashMap<CategoryId, usize> = HashMap::new();
        let mut current = start;

        let base = loop {
            if let Some(depth) = depths.get(&current) {
                break *depth;
            }
            if let Some(&pos) = on_stack.get(&current) {
                let cycle = stack.split_off(pos);
                for id in &cycle {
                    depths.insert(*id, None);
                }
                cycles.push(cycle);
                break None;
            }
            let Some(node) = nodes.get(&current) else {
                break None;
            };
            match node.parent_id {
                None => {
                    depths.insert(current, Some(0));
                    break Some(0);
                }
                Some(pid) if nodes.contains_key(&pid) => {
                    on_stack.insert(current, stack.len());
                    stack.push(current);
                    current = pid;
                }
                Some(_) => {
                    depths.insert(current, None);
                    break None;
                }
            }
        };

        // Remaining stack entries are descendants of `current`, deepest last
        let mut depth = base;
        while let Some(id) = stack.pop() {
            depth = depth.map(|d| d + 1);
            depths.insert(id, depth);
        }
    }

    (depths, cycles)
}

// =============================================================================
// Integrity check
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelDrift {
    pub id: CategoryId,
    pub expected: i32,
    pub actual: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateSiblings {
    pub category_type: CategoryType,
    pub parent_id: Option<CategoryId>,
    pub name: String,
    pub ids: Vec<CategoryId>,
}

/// Findings of [`check_integrity`]; every list is ordered by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub total: usize,
    pub level_mismatches: Vec<LevelDrift>,
    /// Nodes whose `parent_id` references a missing row
    pub orphans: Vec<CategoryId>,
    /// Nodes whose parent belongs to another type
    pub cross_type_parents: Vec<CategoryId>,
    pub cycles: Vec<Vec<CategoryId>>,
    pub duplicate_siblings: Vec<DuplicateSiblings>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.level_mismatches.is_empty()
            && self.orphans.is_empty()
            && self.cross_type_parents.is_empty()
            && self.cycles.is_empty()
            && self.duplicate_siblings.is_empty()
    }

    pub fn issue_count(&self) -> usize {
        self.level_mismatches.len()
            + self.orphans.len()
            + self.cross_type_parents.len()
            + self.cycles.len()
            + self.duplicate_siblings.len()
    }
}

pub fn check_integrity(categories: &[Category]) -> IntegrityReport {
    let nodes: HashMap<CategoryId, &Category> = categories.iter().map(|c| (c.id, c)).collect();
    let (depths, cycles) = walk_depths(&nodes);

    let mut sorted: Vec<&Category> = nodes.values().copied().collect();
    sorted.sort_unstable_by_key(|c| c.id);

    let mut report = IntegrityReport {
        total: sorted.len(),
        cycles,
        ..Default::default()
    };

    let mut siblings: BTreeMap<(CategoryType, Option<CategoryId>, String), Vec<CategoryId>> =
        BTreeMap::new();

    for node in sorted {
        if let Some(pid) = node.parent_id {
            match nodes.get(&pid) {
                None => report.orphans.push(node.id),
                Some(parent) if parent.category_type != node.category_type => {
                    report.cross_type_parents.push(node.id)
                }
                Some(_) => {}
            }
        }

        if let Some(Some(expected)) = depths.get(&node.id)
            && *expected != node.level
        {
            report.level_mismatches.push(LevelDrift {
                id: node.id,
                expected: *expected,
                actual: node.level,
            });
        }

        siblings
            .entry((node.category_type.clone(), node.parent_id, node.name.clone()))
            .or_default()
            .push(node.id);
    }

    report.duplicate_siblings = siblings
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|((category_type, parent_id, name), ids)| DuplicateSiblings {
            category_type,
            parent_id,
            name,
            ids,
        })
        .collect();

    report
}

// =============================================================================
// Level repair
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LevelRepair {
    pub checked: usize,
    pub updated: Vec<LevelDrift>,
    /// Nodes left untouched because no root is reachable from them
    pub skipped: Vec<CategoryId>,
}

/// Recompute `level` from `parent_id` for every node of `category_type` and
/// persist the corrected values. Nodes on or below a cycle, or below a
/// dangling or cross-type parent, are skipped.
pub async fn repair_levels<S: CategorySession + ?Sized>(
    session: &mut S,
    category_type: &CategoryType,
) -> RepoResult<LevelRepair> {
    let categories = session.list_by_type(category_type).await?;
    let nodes: HashMap<CategoryId, &Category> = categories.iter().map(|c| (c.id, c)).collect();
    let (depths, cycles) = walk_depths(&nodes);

    let mut repair = LevelRepair {
        checked: categories.len(),
        ..Default::default()
    };

    for node in &categories {
        match depths.get(&node.id).copied().flatten() {
            Some(expected) if expected != node.level => {
                session.set_level(node.id, expected).await?;
                repair.updated.push(LevelDrift {
                    id: node.id,
                    expected,
                    actual: node.level,
                });
            }
            Some(_) => {}
            None => repair.skipped.push(node.id),
        }
    }
    repair.updated.sort_unstable_by_key(|d| d.id);
    repair.skipped.sort_unstable();

    if !cycles.is_empty() {
        tracing::warn!(
            category_type = %category_type,
            cycles = ?cycles,
            "Category cycles found, nodes left unchanged"
        );
    }
    tracing::info!(
        category_type = %category_type,
        checked = repair.checked,
        updated = repair.updated.len(),
        skipped = repair.skipped.len(),
        "Category levels repaired"
    );

    Ok(repair)
}
