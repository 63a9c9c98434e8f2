//! Type catalog and construction capability
//!
//! The engine consumes construction through the narrow [`Registry`] trait.
//! [`TypeCatalog`] is the stock implementation: types are registered into a
//! shared catalog, and each resolver works from an immutable snapshot so a
//! running build never observes registrations made halfway through.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::node::{Instance, Params, ShapeError};

/// Handle for a constructible type, keyed by its unique id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    id: String,
    type_name: &'static str,
}

impl TypeDescriptor {
    /// Create a descriptor.
    pub fn new(id: impl Into<String>, type_name: &'static str) -> Self {
        Self {
            id: id.into(),
            type_name,
        }
    }

    /// Registered type id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Rust type name of instances built for this id.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.type_name)
    }
}

/// Rejection of a parameter map by a constructor.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Parameters had the wrong shape
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Constructor refused the parameters
    #[error("{0}")]
    Rejected(String),
}

impl ValidationError {
    /// Build a free-form rejection.
    pub fn rejected(message: impl Into<String>) -> Self {
        ValidationError::Rejected(message.into())
    }
}

/// Construction capability consumed by the engine.
pub trait Registry: Send + Sync {
    /// Descriptor for `type_id`, or `None` when unregistered.
    fn lookup(&self, type_id: &str) -> Option<TypeDescriptor>;

    /// Build an instance from resolved parameters.
    fn construct(
        &self,
        descriptor: &TypeDescriptor,
        params: Params,
    ) -> Result<Instance, ValidationError>;
}

impl<R: Registry + ?Sized> Registry for Arc<R> {
    fn lookup(&self, type_id: &str) -> Option<TypeDescriptor> {
        (**self).lookup(type_id)
    }

    fn construct(
        &self,
        descriptor: &TypeDescriptor,
        params: Params,
    ) -> Result<Instance, ValidationError> {
        (**self).construct(descriptor, params)
    }
}

/// Factory function that builds an instance from parameters
pub type TypeFactory = Arc<dyn Fn(Params) -> Result<Instance, ValidationError> + Send + Sync>;

#[derive(Clone)]
struct TypeInfo {
    descriptor: TypeDescriptor,
    factory: TypeFactory,
}

/// Mutable catalog of constructible types.
#[derive(Default)]
pub struct TypeCatalog {
    types: RwLock<HashMap<String, TypeInfo>>,
}

impl TypeCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type with a factory function.
    pub fn register<T, F>(&self, type_id: &str, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(Params) -> Result<T, ValidationError> + Send + Sync + 'static,
    {
        let factory: TypeFactory =
            Arc::new(move |params| factory(params).map(|value| Arc::new(value) as Instance));
        self.insert(TypeInfo {
            descriptor: TypeDescriptor::new(type_id, std::any::type_name::<T>()),
            factory,
        });
    }

    /// Register a type whose parameters are all plain values decoded by serde.
    pub fn register_deserialize<T>(&self, type_id: &str)
    where
        T: DeserializeOwned + Any + Send + Sync,
    {
        self.register(type_id, |params: Params| {
            params.deserialize::<T>().map_err(ValidationError::from)
        });
    }

    fn insert(&self, info: TypeInfo) {
        let mut types = self.types.write();
        if let Some(previous) = types.insert(info.descriptor.id.clone(), info) {
            tracing::warn!(
                type_id = %previous.descriptor.id,
                "type re-registered; replacing {}",
                previous.descriptor.type_name
            );
        }
    }

    /// Check whether the catalog contains the specified type.
    pub fn has_type(&self, type_id: &str) -> bool {
        self.types.read().contains_key(type_id)
    }

    /// Produce an immutable snapshot for a resolver.
    pub fn snapshot(&self) -> TypeRegistry {
        let types = self.types.read();
        TypeRegistry {
            types: Arc::new(types.clone()),
        }
    }
}

/// Immutable view of a [`TypeCatalog`].
#[derive(Clone)]
pub struct TypeRegistry {
    types: Arc<HashMap<String, TypeInfo>>,
}

impl TypeRegistry {
    /// Check whether the snapshot contains the specified type.
    pub fn has_type(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    /// List all type ids known to this snapshot, sorted.
    pub fn list_types(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.types.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Registry for TypeRegistry {
    fn lookup(&self, type_id: &str) -> Option<TypeDescriptor> {
        self.types.get(type_id).map(|info| info.descriptor.clone())
    }

    fn construct(
        &self,
        descriptor: &TypeDescriptor,
        params: Params,
    ) -> Result<Instance, ValidationError> {
        let info = self.types.get(descriptor.id()).ok_or_else(|| {
            ValidationError::rejected(format!("type '{}' is not registered", descriptor.id()))
        })?;
        (info.factory)(params)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.list_types())
            .finish()
    }
}
