//! Typed hydration
//!
//! Decoding the materialized document into a caller-chosen shape. Shapes that
//! hold instances implement [`Hydrate`] by hand with the [`Fields`] accessors;
//! plain shapes can go through serde with [`Plain`].

use serde::de::DeserializeOwned;

use super::node::{Fields, Node, ShapeError};
use super::walker::ElementTypes;

/// A shape the materialized document can be decoded into.
pub trait Hydrate: Sized {
    /// Decode the materialized document.
    fn hydrate(node: Node) -> Result<Self, ShapeError>;

    /// Element types this shape expects for its sequences, checked during
    /// discovery before anything is constructed.
    fn element_types() -> ElementTypes {
        ElementTypes::new()
    }
}

impl Hydrate for Node {
    fn hydrate(node: Node) -> Result<Self, ShapeError> {
        Ok(node)
    }
}

impl Hydrate for Fields {
    fn hydrate(node: Node) -> Result<Self, ShapeError> {
        node.into_fields()
    }
}

/// Serde-decoded shape for documents whose materialized form is plain.
#[derive(Debug, Clone, PartialEq)]
pub struct Plain<T>(pub T);

impl<T> Plain<T> {
    /// Unwrap the decoded value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: DeserializeOwned> Hydrate for Plain<T> {
    fn hydrate(node: Node) -> Result<Self, ShapeError> {
        node.deserialize().map(Plain)
    }
}
