//! Path-addressed tree walker
//!
//! Depth-first traversal that hands every node (scalars included) to a
//! visitor together with its structural path. Fields are visited in document
//! order and sequences by index, so two walks over the same shape produce the
//! same paths. Discovery and materialization are both visitors over this walker.

use std::collections::BTreeMap;

use super::node::{Fields, Node};
use super::path::StructuralPath;

/// What the walker should do with the node a visitor returns.
#[derive(Debug)]
pub enum Visit {
    /// Keep the returned node and walk into its children
    Descend(Node),
    /// Substitute the returned node; its children are not visited
    Replace(Node),
}

/// Per-node callback driven by [`Walker`].
pub trait Visitor {
    /// Error that aborts the walk
    type Error;

    /// Visit one node. `element_type` is the type id expected for elements of
    /// the enclosing sequence, when one is known.
    fn visit(
        &mut self,
        path: &StructuralPath,
        node: Node,
        element_type: Option<&str>,
    ) -> Result<Visit, Self::Error>;
}

/// Expected element type ids, keyed by the rendered path of a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementTypes {
    by_sequence: BTreeMap<String, String>,
}

impl ElementTypes {
    /// No expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect every element of the sequence at `path` to be built as `type_id`.
    pub fn sequence(mut self, path: impl Into<String>, type_id: impl Into<String>) -> Self {
        self.by_sequence.insert(path.into(), type_id.into());
        self
    }

    /// Expected element type for the sequence at `path`.
    pub fn get(&self, path: &StructuralPath) -> Option<&str> {
        self.by_sequence.get(path.as_str()).map(String::as_str)
    }

    /// Whether no expectations are recorded.
    pub fn is_empty(&self) -> bool {
        self.by_sequence.is_empty()
    }
}

/// Depth-first walker.
pub struct Walker<'a> {
    element_types: &'a ElementTypes,
}

impl<'a> Walker<'a> {
    /// Create a walker using the given element type expectations.
    pub fn new(element_types: &'a ElementTypes) -> Self {
        Self { element_types }
    }

    /// Walk a whole document from the root.
    pub fn walk<V: Visitor>(&self, root: Node, visitor: &mut V) -> Result<Node, V::Error> {
        self.walk_at(StructuralPath::root(), root, visitor)
    }

    /// Walk a subtree whose root sits at `path`.
    pub fn walk_at<V: Visitor>(
        &self,
        path: StructuralPath,
        node: Node,
        visitor: &mut V,
    ) -> Result<Node, V::Error> {
        self.walk_node(&path, node, None, visitor)
    }

    fn walk_node<V: Visitor>(
        &self,
        path: &StructuralPath,
        node: Node,
        element_type: Option<&str>,
        visitor: &mut V,
    ) -> Result<Node, V::Error> {
        let node = match visitor.visit(path, node, element_type)? {
            Visit::Replace(node) => return Ok(node),
            Visit::Descend(node) => node,
        };

        match node {
            Node::Fields(fields) => {
                let mut walked = Fields::new();
                for (name, child) in fields {
                    let child_path = path.field(&name);
                    let child = self.walk_node(&child_path, child, None, visitor)?;
                    walked.insert(name, child);
                }
                Ok(Node::Fields(walked))
            }
            Node::Sequence(items) => {
                let expected = self.element_types.get(path);
                let mut walked = Vec::with_capacity(items.len());
                for (index, child) in items.into_iter().enumerate() {
                    let child_path = path.index(index);
                    walked.push(self.walk_node(&child_path, child, expected, visitor)?);
                }
                Ok(Node::Sequence(walked))
            }
            scalar => Ok(scalar),
        }
    }
}
