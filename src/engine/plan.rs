//! Build plans
//!
//! The outcome of discovery, graph building and ordering without any
//! construction: what would be built, in which order, and why.

use serde::Serialize;

use super::discover::{DirectiveNode, DirectiveSummary};
use super::graph::ReferenceMap;
use super::path::StructuralPath;
use super::reference::AliasIndex;

/// One construction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    /// The directive to construct
    #[serde(flatten)]
    pub directive: DirectiveSummary,
    /// Paths that must be built first
    pub dependencies: Vec<StructuralPath>,
}

/// Construction order and alias table for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    /// Steps in construction order
    pub steps: Vec<PlanStep>,
    /// Declared aliases
    pub aliases: AliasIndex,
}

impl BuildPlan {
    pub(crate) fn new(
        order: &[StructuralPath],
        nodes: &[DirectiveNode],
        graph: &ReferenceMap,
        aliases: AliasIndex,
    ) -> Self {
        let steps = order
            .iter()
            .filter_map(|path| {
                let node = nodes.iter().find(|node| &node.path == path)?;
                let dependencies = graph
                    .dependencies(path.as_str())
                    .map(|deps| deps.iter().cloned().collect())
                    .unwrap_or_default();
                Some(PlanStep {
                    directive: DirectiveSummary::from(node),
                    dependencies,
                })
            })
            .collect();

        Self { steps, aliases }
    }

    /// Number of directives that would be constructed.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether nothing would be constructed.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Paths in construction order.
    pub fn order(&self) -> Vec<&str> {
        self.steps
            .iter()
            .map(|step| step.directive.path.as_str())
            .collect()
    }
}
