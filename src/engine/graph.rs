//! Dependency graph construction
//!
//! Runs once discovery has seen the whole document. A directive depends on
//! every directive whose alias its parameters reference, and on every inline
//! directive nested in its parameters (the nearest enclosing directive owns
//! the inline one).

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

use super::discover::DirectiveNode;
use super::error::{BuildError, BuildResult};
use super::path::StructuralPath;
use super::reference::ReferenceIndex;

/// Directive path → dependency paths, both in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMap {
    edges: IndexMap<StructuralPath, IndexSet<StructuralPath>>,
}

impl ReferenceMap {
    /// Build the map for the discovered directives.
    pub fn build(nodes: &[DirectiveNode], references: &ReferenceIndex) -> BuildResult<Self> {
        let mut edges = IndexMap::with_capacity(nodes.len());

        for node in nodes {
            let mut deps = IndexSet::new();
            for alias in &node.references {
                let target = references.aliases().get(alias).ok_or_else(|| {
                    BuildError::UnresolvedReference {
                        alias: alias.clone(),
                        referenced_by: node.path.clone(),
                    }
                })?;
                deps.insert(target.clone());
            }
            edges.insert(node.path.clone(), deps);
        }

        let directive_paths: HashSet<&StructuralPath> = nodes.iter().map(|n| &n.path).collect();
        for node in nodes {
            let owner = node
                .path
                .ancestors()
                .find(|ancestor| directive_paths.contains(ancestor));
            if let Some(owner) = owner {
                if let Some(deps) = edges.get_mut(&owner) {
                    deps.insert(node.path.clone());
                }
            }
        }

        Ok(Self { edges })
    }

    /// Dependencies of the directive at `path`.
    pub fn dependencies(&self, path: &str) -> Option<&IndexSet<StructuralPath>> {
        self.edges.get(path)
    }

    /// Directive paths with their dependencies.
    pub fn iter(&self) -> impl Iterator<Item = (&StructuralPath, &IndexSet<StructuralPath>)> {
        self.edges.iter()
    }

    /// Position of `path` in discovery order.
    pub fn ordinal(&self, path: &StructuralPath) -> Option<usize> {
        self.edges.get_index_of(path)
    }

    /// Path at discovery position `ordinal`.
    pub fn path(&self, ordinal: usize) -> Option<&StructuralPath> {
        self.edges.get_index(ordinal).map(|(path, _)| path)
    }

    /// Number of directive nodes.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Total number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(IndexSet::len).sum()
    }
}
