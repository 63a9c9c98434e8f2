//! Instance resolution
//!
//! Constructs directives in the order computed by the topological resolver.
//! Parameters are resolved right before construction: alias references and
//! inline directives are swapped for instances already in the table, which the
//! ordering guarantees are present.

use indexmap::IndexMap;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use super::directive::ReferenceSyntax;
use super::discover::DirectiveNode;
use super::error::{BuildError, BuildResult};
use super::materialize::Substitution;
use super::node::{Fields, Instance, downcast};
use super::path::StructuralPath;
use super::reference::AliasIndex;
use super::registry::Registry;
use super::walker::{ElementTypes, Walker};

/// One constructed directive.
#[derive(Debug, Clone)]
pub struct Constructed {
    /// Where the directive sat
    pub path: StructuralPath,
    /// Registered type id
    pub type_id: String,
    /// Declared alias
    pub alias: Option<String>,
    /// The instance
    pub instance: Instance,
}

/// Path → constructed instance, in construction order. Append-only.
#[derive(Debug, Clone, Default)]
pub struct InstanceTable {
    entries: IndexMap<StructuralPath, Constructed>,
}

impl InstanceTable {
    /// Instance built at `path`.
    pub fn get(&self, path: &str) -> Option<&Instance> {
        self.entries.get(path).map(|entry| &entry.instance)
    }

    /// Full record for `path`.
    pub fn entry(&self, path: &str) -> Option<&Constructed> {
        self.entries.get(path)
    }

    /// Whether an instance exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Records in construction order.
    pub fn iter(&self) -> impl Iterator<Item = &Constructed> {
        self.entries.values()
    }

    /// Paths in construction order.
    pub fn paths(&self) -> impl Iterator<Item = &StructuralPath> {
        self.entries.keys()
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was constructed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a record. Returns `false` and keeps the existing record when the
    /// path is already present.
    fn record(&mut self, constructed: Constructed) -> bool {
        if self.entries.contains_key(&constructed.path) {
            return false;
        }
        self.entries.insert(constructed.path.clone(), constructed);
        true
    }
}

/// Constructs directives in a given order.
pub struct InstanceService<'a, R: ?Sized> {
    registry: &'a R,
    syntax: &'a ReferenceSyntax,
    aliases: &'a AliasIndex,
}

impl<'a, R: Registry + ?Sized> InstanceService<'a, R> {
    /// Create a service for one build.
    pub fn new(registry: &'a R, syntax: &'a ReferenceSyntax, aliases: &'a AliasIndex) -> Self {
        Self {
            registry,
            syntax,
            aliases,
        }
    }

    /// Construct every path in `order`, which must list dependencies first.
    pub fn resolve(
        &self,
        order: &[StructuralPath],
        nodes: &[DirectiveNode],
    ) -> BuildResult<InstanceTable> {
        let by_path: HashMap<&str, &DirectiveNode> =
            nodes.iter().map(|node| (node.path.as_str(), node)).collect();
        let mut table = InstanceTable::default();

        for path in order {
            let Some(&node) = by_path.get(path.as_str()) else {
                continue;
            };
            if table.contains(path.as_str()) {
                tracing::warn!(path = %path, "directive listed twice in construction order");
                continue;
            }

            let params = self.resolve_params(node, &table)?;
            tracing::trace!(path = %path, type_id = node.type_id(), "constructing");
            let instance = self
                .registry
                .construct(&node.descriptor, params)
                .map_err(|source| BuildError::Construction {
                    path: path.clone(),
                    type_id: node.type_id().to_string(),
                    source,
                })?;

            table.record(Constructed {
                path: path.clone(),
                type_id: node.type_id().to_string(),
                alias: node.alias.clone(),
                instance,
            });
        }

        Ok(table)
    }

    fn resolve_params(&self, node: &DirectiveNode, table: &InstanceTable) -> BuildResult<Fields> {
        let no_hints = ElementTypes::new();
        let walker = Walker::new(&no_hints);
        let mut substitution = Substitution::new(table, self.aliases, self.syntax);

        let mut params = Fields::new();
        for (name, value) in node.params.iter() {
            let resolved = walker.walk_at(node.path.field(name), value.clone(), &mut substitution)?;
            params.insert(name, resolved);
        }
        Ok(params)
    }
}

/// Raw build result: every constructed instance plus the alias index.
#[derive(Debug, Clone, Default)]
pub struct Reflections {
    instances: InstanceTable,
    aliases: AliasIndex,
}

impl Reflections {
    /// Bundle a table with its aliases.
    pub fn new(instances: InstanceTable, aliases: AliasIndex) -> Self {
        Self { instances, aliases }
    }

    /// The instance table.
    pub fn instances(&self) -> &InstanceTable {
        &self.instances
    }

    /// The alias index.
    pub fn aliases(&self) -> &AliasIndex {
        &self.aliases
    }

    /// Instance built at a structural path.
    pub fn by_path(&self, path: &str) -> Option<&Instance> {
        self.instances.get(path)
    }

    /// Instance declared under `alias`.
    pub fn by_alias(&self, alias: &str) -> Option<&Instance> {
        let path = self.aliases.get(alias)?;
        self.instances.get(path.as_str())
    }

    /// Instance declared under `alias`, downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, alias: &str) -> Option<Arc<T>> {
        self.by_alias(alias)
            .and_then(|instance| downcast(instance.clone()).ok())
    }

    /// Every instance of Rust type `T`, in construction order.
    pub fn all_of<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        self.instances
            .iter()
            .filter_map(|entry| downcast(entry.instance.clone()).ok())
            .collect()
    }

    /// Records built for a registered type id, in construction order.
    pub fn of_type<'s>(&'s self, type_id: &'s str) -> impl Iterator<Item = &'s Constructed> + 's {
        self.instances
            .iter()
            .filter(move |entry| entry.type_id == type_id)
    }

    /// Paths in construction order.
    pub fn paths(&self) -> impl Iterator<Item = &StructuralPath> {
        self.instances.paths()
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether nothing was constructed.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Split into table and aliases.
    pub fn into_parts(self) -> (InstanceTable, AliasIndex) {
        (self.instances, self.aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constructed(path: &str, type_id: &str, alias: Option<&str>, instance: Instance) -> Constructed {
        Constructed {
            path: StructuralPath::root().field(path),
            type_id: type_id.to_string(),
            alias: alias.map(str::to_string),
            instance,
        }
    }

    #[test]
    fn test_table_is_append_only() {
        let mut table = InstanceTable::default();
        let first: Instance = Arc::new(1u32);
        assert!(table.record(constructed("a", "svc", None, first.clone())));
        assert!(!table.record(constructed("a", "svc", None, Arc::new(2u32))));
        assert!(Arc::ptr_eq(table.get("a").unwrap(), &first));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reflections_queries() {
        let mut table = InstanceTable::default();
        table.record(constructed("a", "num", Some("one"), Arc::new(1u32)));
        table.record(constructed("b", "text", None, Arc::new(String::from("x"))));
        table.record(constructed("c", "num", None, Arc::new(3u32)));

        let mut index = crate::engine::reference::ReferenceIndex::new(ReferenceSyntax::default());
        index.declare("one", &StructuralPath::root().field("a")).unwrap();
        let reflections = Reflections::new(table, index.into_aliases());

        assert_eq!(*reflections.get::<u32>("one").unwrap(), 1);
        assert!(reflections.get::<String>("one").is_none());
        assert!(reflections.by_alias("missing").is_none());
        assert!(reflections.by_path("b").is_some());
        assert_eq!(
            reflections.all_of::<u32>().iter().map(|n| **n).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(reflections.of_type("num").count(), 2);
        let paths: Vec<&str> = reflections.paths().map(|p| p.as_str()).collect();
        assert_eq!(paths, vec!["a", "b", "c"]);
    }
}
