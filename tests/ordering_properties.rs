//! Property-based tests for construction ordering and plain documents
//!
//! Invariants that should hold for every generated input:
//! - Determinism: identical documents construct in identical order
//! - Dependencies first: every referenced alias is built before its user
//! - Transparency: documents without directives build nothing and
//!   materialize unchanged

use confwire::{Node, Resolver, TypeCatalog, TypeRegistry};
use proptest::prelude::*;
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};

fn recording_registry(log: Arc<Mutex<Vec<String>>>) -> TypeRegistry {
    let catalog = TypeCatalog::new();
    catalog.register("node", move |mut params| {
        let name: String = params.value("name")?;
        log.lock().unwrap().push(name.clone());
        Ok(name)
    });
    catalog.snapshot()
}

/// Acyclic documents: node `i` may only reference nodes with a lower index,
/// but nodes appear in the document in reverse index order.
fn acyclic_document() -> impl Strategy<Value = (Value, Vec<Vec<usize>>)> {
    (1usize..10)
        .prop_flat_map(|count| {
            (0..count)
                .map(|index| proptest::collection::vec(0..index.max(1), 0..=index.min(3)))
                .collect::<Vec<_>>()
        })
        .prop_map(|raw_deps| {
            let deps: Vec<Vec<usize>> = raw_deps
                .into_iter()
                .enumerate()
                .map(|(index, deps)| deps.into_iter().filter(|dep| *dep < index).collect())
                .collect();

            let mut fields = Map::new();
            for index in (0..deps.len()).rev() {
                let refs: Vec<Value> = deps[index]
                    .iter()
                    .map(|dep| Value::String(format!("$n{}", dep)))
                    .collect();
                fields.insert(
                    format!("node_{}", index),
                    json!({"@": format!("node:n{}", index), "name": format!("n{}", index), "deps": refs}),
                );
            }
            (Value::Object(fields), deps)
        })
}

/// Arbitrary documents with no directive keys and no reference strings.
fn plain_document() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z ]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z]{1,5}", inner, 0..6)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn construction_log(document: &Value) -> Vec<String> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let resolver = Resolver::new(recording_registry(log.clone()));
    resolver.resolve_raw(Node::from_json(document.clone())).unwrap();
    let recorded = log.lock().unwrap().clone();
    recorded
}

proptest! {
    #[test]
    fn prop_construction_order_is_deterministic((document, _) in acyclic_document()) {
        let first = construction_log(&document);
        let second = construction_log(&document);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_dependencies_are_built_first((document, deps) in acyclic_document()) {
        let log = construction_log(&document);
        prop_assert_eq!(log.len(), deps.len());

        let position = |index: usize| log.iter().position(|name| name == &format!("n{}", index));
        for (index, node_deps) in deps.iter().enumerate() {
            let at = position(index).unwrap();
            for dep in node_deps {
                prop_assert!(position(*dep).unwrap() < at);
            }
        }
    }

    #[test]
    fn prop_plain_documents_pass_through(document in plain_document()) {
        let resolver = Resolver::new(recording_registry(Arc::new(Mutex::new(Vec::new()))));
        let (materialized, reflections) = resolver
            .materialize(Node::from_json(document.clone()))
            .unwrap();

        prop_assert!(reflections.is_empty());
        prop_assert_eq!(materialized.to_json().unwrap(), document);
    }
}
