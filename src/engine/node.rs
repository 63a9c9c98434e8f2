//! Document tree model
//!
//! Documents are held as a tagged union of field containers, sequences and
//! scalars. After materialization a tree may also carry constructed instances,
//! which is why this is not just `serde_json::Value`.

use blake3::Hasher;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A constructed instance, shared by every site that refers to it.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Stable identity of a document's content (blake3 hex digest).
pub type DocumentId = String;

/// A node in a document tree.
#[derive(Clone)]
pub enum Node {
    /// JSON null
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Numeric scalar
    Number(Number),
    /// String scalar
    String(String),
    /// Ordered sequence container
    Sequence(Vec<Node>),
    /// Field-keyed container, in document order
    Fields(Fields),
    /// A constructed instance
    Instance(Instance),
}

/// Errors raised when a node does not have the shape a consumer expects.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// Required field absent
    #[error("missing field '{0}'")]
    MissingField(String),

    /// Node kind differs from the expected one
    #[error("expected {expected}, found {found}")]
    UnexpectedKind {
        /// Expected node kind
        expected: &'static str,
        /// Actual node kind
        found: &'static str,
    },

    /// Instance is not of the requested Rust type
    #[error("instance is not a {expected}")]
    Downcast {
        /// Requested type name
        expected: &'static str,
    },

    /// A plain value was expected but an instance was found
    #[error("constructed instance cannot be converted to a plain value")]
    InstanceInPlainValue,

    /// serde rejected the plain value
    #[error("{0}")]
    Deserialize(#[from] serde_json::Error),

    /// Error located at a named field
    #[error("field '{field}': {source}")]
    Field {
        /// Field name
        field: String,
        /// Underlying error
        #[source]
        source: Box<ShapeError>,
    },

    /// Error located at a sequence position
    #[error("element {index}: {source}")]
    Element {
        /// Sequence index
        index: usize,
        /// Underlying error
        #[source]
        source: Box<ShapeError>,
    },

    /// Free-form rejection from a hand-written decoder
    #[error("{0}")]
    Custom(String),
}

impl ShapeError {
    /// Attach a field name to this error.
    pub fn at_field(self, field: impl Into<String>) -> Self {
        ShapeError::Field {
            field: field.into(),
            source: Box::new(self),
        }
    }

    /// Attach a sequence index to this error.
    pub fn at_index(self, index: usize) -> Self {
        ShapeError::Element {
            index,
            source: Box::new(self),
        }
    }
}

impl Node {
    /// Human-readable name of this node's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::Sequence(_) => "sequence",
            Node::Fields(_) => "fields",
            Node::Instance(_) => "instance",
        }
    }

    /// Convert a JSON value, keeping field order.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(flag) => Node::Bool(flag),
            Value::Number(num) => Node::Number(num),
            Value::String(text) => Node::String(text),
            Value::Array(items) => Node::Sequence(items.into_iter().map(Node::from_json).collect()),
            Value::Object(map) => Node::Fields(
                map.into_iter()
                    .map(|(key, value)| (key, Node::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Convert back to JSON. Fails if the tree holds any instance.
    pub fn to_json(&self) -> Result<Value, ShapeError> {
        match self {
            Node::Null => Ok(Value::Null),
            Node::Bool(flag) => Ok(Value::Bool(*flag)),
            Node::Number(num) => Ok(Value::Number(num.clone())),
            Node::String(text) => Ok(Value::String(text.clone())),
            Node::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| item.to_json().map_err(|e| e.at_index(index)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Node::Fields(fields) => fields.to_json().map(Value::Object),
            Node::Instance(_) => Err(ShapeError::InstanceInPlainValue),
        }
    }

    /// Decode a plain subtree with serde.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ShapeError> {
        Ok(serde_json::from_value(self.to_json()?)?)
    }

    /// String content, if this is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(text) => Some(text),
            _ => None,
        }
    }

    /// Instance handle, if this node is an instance.
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Node::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Field container, if this node is one.
    pub fn as_fields(&self) -> Option<&Fields> {
        match self {
            Node::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    /// Take the instance out of this node and downcast it.
    pub fn into_instance<T: Any + Send + Sync>(self) -> Result<Arc<T>, ShapeError> {
        match self {
            Node::Instance(instance) => downcast(instance),
            other => Err(ShapeError::UnexpectedKind {
                expected: "instance",
                found: other.kind(),
            }),
        }
    }

    /// Take the field container out of this node.
    pub fn into_fields(self) -> Result<Fields, ShapeError> {
        match self {
            Node::Fields(fields) => Ok(fields),
            other => Err(ShapeError::UnexpectedKind {
                expected: "fields",
                found: other.kind(),
            }),
        }
    }

    /// Take the sequence out of this node.
    pub fn into_sequence(self) -> Result<Vec<Node>, ShapeError> {
        match self {
            Node::Sequence(items) => Ok(items),
            other => Err(ShapeError::UnexpectedKind {
                expected: "sequence",
                found: other.kind(),
            }),
        }
    }

    /// Compute the content fingerprint of this tree.
    ///
    /// Field order is significant. Instances contribute their pointer identity.
    pub fn fingerprint(&self) -> DocumentId {
        let mut hasher = Hasher::new();
        self.feed(&mut hasher);
        format!("{}", hasher.finalize().to_hex())
    }

    fn feed(&self, hasher: &mut Hasher) {
        match self {
            Node::Null => {
                hasher.update(b"n");
            }
            Node::Bool(flag) => {
                hasher.update(if *flag { b"t" } else { b"f" });
            }
            Node::Number(num) => {
                feed_str(hasher, b'#', &num.to_string());
            }
            Node::String(text) => {
                feed_str(hasher, b's', text);
            }
            Node::Sequence(items) => {
                hasher.update(b"[");
                hasher.update(&(items.len() as u64).to_le_bytes());
                for item in items {
                    item.feed(hasher);
                }
            }
            Node::Fields(fields) => {
                hasher.update(b"{");
                hasher.update(&(fields.len() as u64).to_le_bytes());
                for (key, value) in fields.iter() {
                    feed_str(hasher, b'k', key);
                    value.feed(hasher);
                }
            }
            Node::Instance(instance) => {
                let address = Arc::as_ptr(instance) as *const () as usize;
                hasher.update(b"i");
                hasher.update(&(address as u64).to_le_bytes());
            }
        }
    }
}

fn feed_str(hasher: &mut Hasher, tag: u8, text: &str) {
    hasher.update(&[tag]);
    hasher.update(&(text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
}

/// Downcast a shared instance to a concrete type.
pub fn downcast<T: Any + Send + Sync>(instance: Instance) -> Result<Arc<T>, ShapeError> {
    instance.downcast::<T>().map_err(|_| ShapeError::Downcast {
        expected: std::any::type_name::<T>(),
    })
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Null, Node::Null) => true,
            (Node::Bool(a), Node::Bool(b)) => a == b,
            (Node::Number(a), Node::Number(b)) => a == b,
            (Node::String(a), Node::String(b)) => a == b,
            (Node::Sequence(a), Node::Sequence(b)) => a == b,
            (Node::Fields(a), Node::Fields(b)) => a == b,
            (Node::Instance(a), Node::Instance(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Null => write!(f, "null"),
            Node::Bool(flag) => write!(f, "{}", flag),
            Node::Number(num) => write!(f, "{}", num),
            Node::String(text) => write!(f, "{:?}", text),
            Node::Sequence(items) => f.debug_list().entries(items).finish(),
            Node::Fields(fields) => fmt::Debug::fmt(fields, f),
            Node::Instance(instance) => {
                write!(f, "<instance@{:p}>", Arc::as_ptr(instance) as *const ())
            }
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::from_json(value)
    }
}

impl From<Fields> for Node {
    fn from(fields: Fields) -> Self {
        Node::Fields(fields)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::String(text.to_string())
    }
}

/// Ordered field container.
///
/// Also serves as the parameter map handed to constructors and as the entry
/// point for hand-written typed decoders.
#[derive(Clone, Default, PartialEq)]
pub struct Fields {
    entries: IndexMap<String, Node>,
}

/// Parameter map handed to a constructor.
pub type Params = Fields;

impl Fields {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the container has no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace a field, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Node>) -> Option<Node> {
        self.entries.insert(name.into(), value.into())
    }

    /// Borrow a field.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries.get(name)
    }

    /// Whether a field is present.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Remove a field, preserving the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<Node> {
        self.entries.shift_remove(name)
    }

    /// Field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Remove and return a required field.
    pub fn take(&mut self, name: &str) -> Result<Node, ShapeError> {
        self.remove(name)
            .ok_or_else(|| ShapeError::MissingField(name.to_string()))
    }

    /// Remove a required field holding an instance of `T`.
    pub fn instance<T: Any + Send + Sync>(&mut self, name: &str) -> Result<Arc<T>, ShapeError> {
        self.take(name)?
            .into_instance()
            .map_err(|e| e.at_field(name))
    }

    /// Remove a required field holding a sequence of `T` instances.
    pub fn instances<T: Any + Send + Sync>(
        &mut self,
        name: &str,
    ) -> Result<Vec<Arc<T>>, ShapeError> {
        let items = self.take(name)?.into_sequence().map_err(|e| e.at_field(name))?;
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                item.into_instance()
                    .map_err(|e| e.at_index(index).at_field(name))
            })
            .collect()
    }

    /// Remove a required plain field and decode it with serde.
    pub fn value<T: DeserializeOwned>(&mut self, name: &str) -> Result<T, ShapeError> {
        self.take(name)?
            .deserialize()
            .map_err(|e| e.at_field(name))
    }

    /// Remove an optional plain field and decode it with serde.
    pub fn optional<T: DeserializeOwned>(&mut self, name: &str) -> Result<Option<T>, ShapeError> {
        match self.remove(name) {
            None | Some(Node::Null) => Ok(None),
            Some(node) => node.deserialize().map(Some).map_err(|e| e.at_field(name)),
        }
    }

    /// Decode the whole container with serde. Every field must be plain.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ShapeError> {
        Ok(serde_json::from_value(Value::Object(self.to_json()?))?)
    }

    /// Convert to a JSON object. Fails if any field holds an instance.
    pub fn to_json(&self) -> Result<serde_json::Map<String, Value>, ShapeError> {
        self.entries
            .iter()
            .map(|(key, value)| {
                value
                    .to_json()
                    .map(|json| (key.clone(), json))
                    .map_err(|e| e.at_field(key.clone()))
            })
            .collect()
    }
}

impl fmt::Debug for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl FromIterator<(String, Node)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Fields {
    type Item = (String, Node);
    type IntoIter = indexmap::map::IntoIter<String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
