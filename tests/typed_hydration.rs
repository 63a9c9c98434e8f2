//! Integration tests for typed resolution
//!
//! Hand-written `Hydrate` shapes, sequence element types, serde-backed plain
//! shapes, and documents loaded from disk.

use confwire::{
    BuildError, BuildStage, ElementTypes, Hydrate, Node, Plain, Resolver, ResolverConfig,
    ShapeError, TypeCatalog, TypeRegistry, load_document,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
struct Database {
    url: String,
    #[serde(default)]
    pool: u32,
}

#[derive(Debug)]
struct Handler {
    route: String,
    database: Arc<Database>,
}

/// Application wiring decoded from a materialized document
struct App {
    name: String,
    database: Arc<Database>,
    handlers: Vec<Arc<Handler>>,
}

impl Hydrate for App {
    fn hydrate(node: Node) -> Result<Self, ShapeError> {
        let mut fields = node.into_fields()?;
        Ok(App {
            name: fields.value("name")?,
            database: fields.instance("database")?,
            handlers: fields.instances("handlers")?,
        })
    }

    fn element_types() -> ElementTypes {
        ElementTypes::new().sequence("handlers", "handler")
    }
}

fn registry() -> TypeRegistry {
    let catalog = TypeCatalog::new();
    catalog.register_deserialize::<Database>("database");
    catalog.register("handler", |mut params| {
        Ok(Handler {
            route: params.value("route")?,
            database: params.instance("db")?,
        })
    });
    catalog.snapshot()
}

#[test]
fn test_typed_shape_shares_instances() {
    let resolver = Resolver::new(registry());
    let app: App = resolver
        .resolve_typed(Node::from_json(json!({
            "name": "shop",
            "database": {"@": "database:db", "url": "postgres://localhost", "pool": 4},
            "handlers": [
                {"@": "handler", "route": "/cart", "db": "$db"},
                {"@": "handler", "route": "/checkout", "db": "$db"}
            ]
        })))
        .unwrap();

    assert_eq!(app.name, "shop");
    assert_eq!(app.database.url, "postgres://localhost");
    assert_eq!(app.database.pool, 4);
    assert_eq!(app.handlers.len(), 2);
    assert_eq!(app.handlers[1].route, "/checkout");
    for handler in &app.handlers {
        assert!(Arc::ptr_eq(&handler.database, &app.database));
    }
}

#[test]
fn test_wrong_element_type_fails_before_construction() {
    let resolver = Resolver::new(registry());
    let err = resolver
        .resolve_typed::<App>(Node::from_json(json!({
            "name": "shop",
            "database": {"@": "database:db", "url": "x"},
            "handlers": [{"@": "database", "url": "y"}]
        })))
        .err()
        .unwrap();

    match &err {
        BuildError::Decode { path, .. } => assert_eq!(path.as_str(), "handlers[0]"),
        other => panic!("expected Decode, got {other}"),
    }
    assert_eq!(err.stage(), BuildStage::Discovering);
}

#[test]
fn test_shape_mismatch_is_a_decode_failure() {
    let resolver = Resolver::new(registry());
    let err = resolver
        .resolve_typed::<App>(Node::from_json(json!({
            "name": "shop",
            "database": "not an instance",
            "handlers": []
        })))
        .err()
        .unwrap();

    match &err {
        BuildError::Decode { path, source } => {
            assert!(path.is_root());
            assert!(matches!(source, ShapeError::Field { field, .. } if field == "database"));
        }
        other => panic!("expected Decode, got {other}"),
    }
    assert_eq!(err.stage(), BuildStage::Materializing);
}

#[test]
fn test_plain_shape_through_serde() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Settings {
        retries: u8,
        greeting: String,
    }

    let resolver = Resolver::new(registry());
    let Plain(settings) = resolver
        .resolve_typed::<Plain<Settings>>(Node::from_json(json!({
            "retries": 2,
            "greeting": "$$hello"
        })))
        .unwrap();

    assert_eq!(
        settings,
        Settings {
            retries: 2,
            greeting: "$hello".to_string()
        }
    );
}

#[test]
fn test_custom_syntax_from_config_file() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("resolver.json");
    std::fs::write(
        &config_path,
        r##"{"directive_key": "kind", "alias_separator": "#", "reference_prefix": "&"}"##,
    )
    .unwrap();
    let doc_path = temp.path().join("app.json");
    std::fs::write(
        &doc_path,
        r#"{
            "name": "shop",
            "database": {"kind": "database#db", "url": "sqlite::memory:"},
            "handlers": [{"kind": "handler", "route": "/", "db": "&db"}]
        }"#,
    )
    .unwrap();

    let config = ResolverConfig::load(&config_path).unwrap();
    let resolver = Resolver::with_config(registry(), config);
    let app: App = resolver
        .resolve_typed(load_document(&doc_path).unwrap())
        .unwrap();

    assert_eq!(app.database.url, "sqlite::memory:");
    assert!(Arc::ptr_eq(&app.handlers[0].database, &app.database));
}
