//! Structural paths
//!
//! A structural path names a node by its position in the document: a sequence of
//! field and index accessors from the root. Paths are the primary key for
//! directive nodes and for constructed instances, so the rendered form must be
//! injective and stable across repeated walks of the same document shape.

use serde::{Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One accessor step inside a [`StructuralPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Field of a field container
    Field(String),
    /// Position inside a sequence
    Index(usize),
}

/// Position of a node within a document.
///
/// Equality, ordering and hashing use the rendered form only, which lets maps
/// keyed by paths be queried with a plain `&str`.
#[derive(Clone)]
pub struct StructuralPath {
    segments: Vec<Segment>,
    rendered: String,
}

impl StructuralPath {
    /// The document root.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
            rendered: String::new(),
        }
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Accessor steps from the root.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of accessor steps.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Rendered form (`""` for the root).
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Path of the named field below this node.
    pub fn field(&self, name: &str) -> Self {
        let mut rendered = self.rendered.clone();
        if is_bare_field(name) {
            if !rendered.is_empty() {
                rendered.push('.');
            }
            rendered.push_str(name);
        } else {
            rendered.push('[');
            rendered.push_str(&quote(name));
            rendered.push(']');
        }

        let mut segments = self.segments.clone();
        segments.push(Segment::Field(name.to_string()));
        Self { segments, rendered }
    }

    /// Path of the sequence element at `index` below this node.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self {
            segments,
            rendered: format!("{}[{}]", self.rendered, index),
        }
    }

    /// Parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        let mut parent = Self::root();
        for segment in init {
            parent = match segment {
                Segment::Field(name) => parent.field(name),
                Segment::Index(index) => parent.index(*index),
            };
        }
        Some(parent)
    }

    /// Iterate over the proper ancestors of this path, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = StructuralPath> {
        std::iter::successors(self.parent(), |path| path.parent())
    }

    /// Whether `self` lies strictly below `other`.
    pub fn is_descendant_of(&self, other: &StructuralPath) -> bool {
        self.segments.len() > other.segments.len()
            && self.segments[..other.segments.len()] == other.segments[..]
    }
}

fn is_bare_field(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn quote(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl PartialEq for StructuralPath {
    fn eq(&self, other: &Self) -> bool {
        self.rendered == other.rendered
    }
}

impl Eq for StructuralPath {}

impl PartialOrd for StructuralPath {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StructuralPath {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rendered.cmp(&other.rendered)
    }
}

impl Hash for StructuralPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rendered.hash(state);
    }
}

impl Borrow<str> for StructuralPath {
    fn borrow(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rendered.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.rendered)
        }
    }
}

impl fmt::Debug for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StructuralPath({:?})", self.rendered)
    }
}

impl Serialize for StructuralPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.rendered)
    }
}
