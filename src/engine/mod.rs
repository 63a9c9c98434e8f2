//! Build engine and public API
//!
//! A build turns a document into constructed instances in five sequential
//! stages: discovery, graph building, ordering, resolution and
//! materialization. All per-build state is created inside one call and dropped
//! when it returns, so a [`Resolver`] can be shared across threads and reused
//! without builds observing each other.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// Submodules
pub mod cache;
pub mod config;
pub mod directive;
pub mod discover;
pub mod error;
pub mod graph;
pub mod hydrate;
pub mod instance;
pub mod materialize;
pub mod node;
pub mod order;
pub mod path;
pub mod plan;
pub mod reference;
pub mod registry;
pub mod source;
pub mod walker;

use directive::{DirectiveParser, ReferenceSyntax};
use discover::{DirectiveNode, Discovery};
use error::{BuildError, BuildResult};
use graph::ReferenceMap;
use hydrate::Hydrate;
use instance::{InstanceService, Reflections};
use node::Node;
use order::construction_order;
use path::StructuralPath;
use plan::BuildPlan;
use reference::{AliasIndex, ReferenceIndex};
use registry::Registry;
use walker::{ElementTypes, Walker};

pub use config::ResolverConfig;

/// Lifecycle of one build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildStage {
    /// Not started
    Idle,
    /// Walking the document for directives and aliases
    Discovering,
    /// Turning references into dependency edges
    GraphBuilding,
    /// Computing construction order
    Ordering,
    /// Constructing instances
    Resolving,
    /// Substituting instances into the document
    Materializing,
    /// Finished successfully
    Done,
    /// Aborted with an error
    Failed,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::Idle => "idle",
            BuildStage::Discovering => "discovering",
            BuildStage::GraphBuilding => "graph-building",
            BuildStage::Ordering => "ordering",
            BuildStage::Resolving => "resolving",
            BuildStage::Materializing => "materializing",
            BuildStage::Done => "done",
            BuildStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

fn next_resolver_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// Builds object graphs from documents.
pub struct Resolver<R> {
    id: u64,
    registry: R,
    config: ResolverConfig,
    parser: Box<dyn DirectiveParser>,
    syntax: ReferenceSyntax,
}

impl<R: Registry> Resolver<R> {
    /// Create a resolver with the default configuration.
    pub fn new(registry: R) -> Self {
        Self::with_config(registry, ResolverConfig::default())
    }

    /// Create a resolver with the given configuration.
    pub fn with_config(registry: R, config: ResolverConfig) -> Self {
        let parser = Box::new(config.parser());
        let syntax = config.reference_syntax();
        Self {
            id: next_resolver_id(),
            registry,
            config,
            parser,
            syntax,
        }
    }

    /// Replace the directive parser.
    pub fn with_parser(mut self, parser: impl DirectiveParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self.id = next_resolver_id();
        self
    }

    /// Process-unique identity. Changes whenever the parser is replaced.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// The active configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The construction capability.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Discover, link and order the document without constructing anything.
    pub fn plan(&self, document: Node) -> BuildResult<BuildPlan> {
        self.build(ElementTypes::new()).run(|build| {
            let linked = build.link(&self.registry, document)?;
            Ok(BuildPlan::new(
                &linked.order,
                &linked.nodes,
                &linked.graph,
                linked.aliases,
            ))
        })
    }

    /// Build every directive and return the raw instance table with aliases.
    pub fn resolve_raw(&self, document: Node) -> BuildResult<Reflections> {
        self.build(ElementTypes::new()).run(|build| {
            let linked = build.link(&self.registry, document)?;
            build.construct(&self.registry, linked).map(|(_, reflections)| reflections)
        })
    }

    /// Build every directive and substitute instances into the document.
    pub fn materialize(&self, document: Node) -> BuildResult<(Node, Reflections)> {
        self.materialize_with(document, ElementTypes::new())
    }

    /// Like [`materialize`](Self::materialize), enforcing sequence element types.
    pub fn materialize_with(
        &self,
        document: Node,
        element_types: ElementTypes,
    ) -> BuildResult<(Node, Reflections)> {
        self.build(element_types).run(|build| {
            let linked = build.link(&self.registry, document)?;
            let (stripped, reflections) = build.construct(&self.registry, linked)?;
            let materialized = build.materialize(stripped, &reflections)?;
            Ok((materialized, reflections))
        })
    }

    /// Build the document and decode it into `T`.
    pub fn resolve_typed<T: Hydrate>(&self, document: Node) -> BuildResult<T> {
        self.build(T::element_types()).run(|build| {
            let linked = build.link(&self.registry, document)?;
            let (stripped, reflections) = build.construct(&self.registry, linked)?;
            let materialized = build.materialize(stripped, &reflections)?;
            T::hydrate(materialized).map_err(|source| BuildError::Decode {
                path: StructuralPath::root(),
                source,
            })
        })
    }

    fn build(&self, element_types: ElementTypes) -> Build<'_> {
        Build {
            parser: self.parser.as_ref(),
            syntax: &self.syntax,
            element_types,
            stage: BuildStage::Idle,
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for Resolver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

/// Output of the first three stages.
struct Linked {
    stripped: Node,
    nodes: Vec<DirectiveNode>,
    aliases: AliasIndex,
    graph: ReferenceMap,
    order: Vec<StructuralPath>,
}

/// Per-build state. Lives for exactly one resolver call.
struct Build<'a> {
    parser: &'a dyn DirectiveParser,
    syntax: &'a ReferenceSyntax,
    element_types: ElementTypes,
    stage: BuildStage,
}

impl Build<'_> {
    fn run<T>(mut self, body: impl FnOnce(&mut Self) -> BuildResult<T>) -> BuildResult<T> {
        let span = tracing::debug_span!("build");
        let _guard = span.enter();

        match body(&mut self) {
            Ok(value) => {
                self.advance(BuildStage::Done);
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(stage = %self.stage, error = %err, "build failed");
                self.advance(BuildStage::Failed);
                Err(err)
            }
        }
    }

    fn advance(&mut self, next: BuildStage) {
        tracing::debug!(from = %self.stage, to = %next, "build stage");
        self.stage = next;
    }

    /// Discovering, GraphBuilding, Ordering.
    fn link<R: Registry + ?Sized>(&mut self, registry: &R, document: Node) -> BuildResult<Linked> {
        self.advance(BuildStage::Discovering);
        let mut discovery = Discovery::new(
            self.parser,
            registry,
            ReferenceIndex::new(self.syntax.clone()),
        );
        let stripped = Walker::new(&self.element_types).walk(document, &mut discovery)?;
        let (nodes, references) = discovery.finish();
        tracing::debug!(
            directives = nodes.len(),
            aliases = references.aliases().len(),
            "discovery complete"
        );

        self.advance(BuildStage::GraphBuilding);
        let graph = ReferenceMap::build(&nodes, &references)?;
        tracing::debug!(edges = graph.edge_count(), "dependency graph built");

        self.advance(BuildStage::Ordering);
        let order = construction_order(&graph)?;

        Ok(Linked {
            stripped,
            nodes,
            aliases: references.into_aliases(),
            graph,
            order,
        })
    }

    /// Resolving.
    fn construct<R: Registry + ?Sized>(
        &mut self,
        registry: &R,
        linked: Linked,
    ) -> BuildResult<(Node, Reflections)> {
        self.advance(BuildStage::Resolving);
        let service = InstanceService::new(registry, self.syntax, &linked.aliases);
        let table = service.resolve(&linked.order, &linked.nodes)?;
        tracing::debug!(instances = table.len(), "instances constructed");
        Ok((linked.stripped, Reflections::new(table, linked.aliases)))
    }

    /// Materializing.
    fn materialize(&mut self, stripped: Node, reflections: &Reflections) -> BuildResult<Node> {
        self.advance(BuildStage::Materializing);
        materialize::materialize(
            stripped,
            reflections.instances(),
            reflections.aliases(),
            self.syntax,
        )
    }
}
