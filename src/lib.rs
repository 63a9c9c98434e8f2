//! Confwire – configuration-driven object graph builder
//!
//! Documents are trees of fields, sequences and scalars. A field container
//! carrying the reserved key `"@"` is a directive: its value names a registered
//! type and optionally an alias (`"type:alias"`), its other fields are
//! construction parameters. Any string `"$alias"` refers to the instance built
//! for that alias.
//!
//! The engine:
//! - Discovers every directive and alias declaration in one walk
//! - Links references into a dependency graph and orders it topologically
//! - Constructs each directive once, through a pluggable [`Registry`]
//! - Substitutes the shared instances back into the document
//!
//! ```
//! use confwire::{Node, Resolver, TypeCatalog};
//! use serde_json::json;
//!
//! let catalog = TypeCatalog::new();
//! catalog.register("counter", |mut params| {
//!     Ok(params.value::<u32>("start").unwrap_or(0))
//! });
//!
//! let resolver = Resolver::new(catalog.snapshot());
//! let reflections = resolver
//!     .resolve_raw(Node::from_json(json!({
//!         "first": {"@": "counter:c", "start": 3},
//!     })))
//!     .unwrap();
//! assert_eq!(*reflections.get::<u32>("c").unwrap(), 3);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Build engine: discovery, linking, ordering, construction, materialization
pub mod engine;

// Re-export key types for convenience
pub use engine::cache::BuildCache;
pub use engine::directive::{DefaultDirectiveParser, DirectiveParser, ReferenceSyntax};
pub use engine::error::{BuildError, BuildResult, LoadError, LoadResult};
pub use engine::hydrate::{Hydrate, Plain};
pub use engine::instance::{InstanceTable, Reflections};
pub use engine::node::{DocumentId, Fields, Instance, Node, Params, ShapeError, downcast};
pub use engine::path::StructuralPath;
pub use engine::plan::{BuildPlan, PlanStep};
pub use engine::registry::{
    Registry, TypeCatalog, TypeDescriptor, TypeRegistry, ValidationError,
};
pub use engine::source::{load_document, parse_document};
pub use engine::walker::ElementTypes;
pub use engine::{BuildStage, Resolver, ResolverConfig};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
