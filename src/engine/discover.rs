//! Discovery pass
//!
//! First walk over the document. Every directive is recognized, checked against
//! the registry, recorded with its raw parameters and scanned references, and
//! its alias declared. The walk returns the document with directive keys
//! stripped, which is what the materialization pass walks later.

use serde::Serialize;

use super::directive::{DirectiveParser, Recognized};
use super::error::{BuildError, BuildResult};
use super::node::{Fields, Node, ShapeError};
use super::path::StructuralPath;
use super::reference::ReferenceIndex;
use super::registry::{Registry, TypeDescriptor};
use super::walker::{Visit, Visitor};

/// A directive found during discovery.
#[derive(Debug, Clone)]
pub struct DirectiveNode {
    /// Where the directive sits
    pub path: StructuralPath,
    /// Position in discovery order
    pub ordinal: usize,
    /// Registry handle for the type
    pub descriptor: TypeDescriptor,
    /// Declared alias
    pub alias: Option<String>,
    /// Raw parameters (nested directives and references unresolved)
    pub params: Fields,
    /// Aliases referenced anywhere in `params`
    pub references: Vec<String>,
    /// Expected element type of the enclosing sequence
    pub element_type: Option<String>,
}

impl DirectiveNode {
    /// Registered type id.
    pub fn type_id(&self) -> &str {
        self.descriptor.id()
    }
}

/// Serializable summary of a directive, used by build plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectiveSummary {
    /// Where the directive sits
    pub path: StructuralPath,
    /// Registered type id
    pub type_id: String,
    /// Declared alias
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Expected element type of the enclosing sequence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
}

impl From<&DirectiveNode> for DirectiveSummary {
    fn from(node: &DirectiveNode) -> Self {
        Self {
            path: node.path.clone(),
            type_id: node.type_id().to_string(),
            alias: node.alias.clone(),
            element_type: node.element_type.clone(),
        }
    }
}

/// Visitor collecting directives and alias declarations.
pub struct Discovery<'a, R: ?Sized> {
    parser: &'a dyn DirectiveParser,
    registry: &'a R,
    references: ReferenceIndex,
    nodes: Vec<DirectiveNode>,
}

impl<'a, R: Registry + ?Sized> Discovery<'a, R> {
    /// Create a discovery visitor with an empty reference index.
    pub fn new(
        parser: &'a dyn DirectiveParser,
        registry: &'a R,
        references: ReferenceIndex,
    ) -> Self {
        Self {
            parser,
            registry,
            references,
            nodes: Vec::new(),
        }
    }

    /// Directives found so far, in discovery order, and the reference index.
    pub fn finish(self) -> (Vec<DirectiveNode>, ReferenceIndex) {
        (self.nodes, self.references)
    }
}

impl<R: Registry + ?Sized> Visitor for Discovery<'_, R> {
    type Error = BuildError;

    fn visit(
        &mut self,
        path: &StructuralPath,
        node: Node,
        element_type: Option<&str>,
    ) -> BuildResult<Visit> {
        let directive = match self.parser.recognize(node) {
            Ok(Recognized::NotADirective(node)) => return Ok(Visit::Descend(node)),
            Ok(Recognized::Directive(directive)) => directive,
            Err(detail) => {
                return Err(BuildError::Format {
                    path: path.clone(),
                    detail,
                });
            }
        };

        let descriptor = self.registry.lookup(&directive.type_id).ok_or_else(|| {
            BuildError::UnknownType {
                path: path.clone(),
                type_id: directive.type_id.clone(),
            }
        })?;

        if let Some(expected) = element_type {
            if expected != directive.type_id {
                return Err(BuildError::Decode {
                    path: path.clone(),
                    source: ShapeError::Custom(format!(
                        "sequence expects elements of type '{}', directive builds '{}'",
                        expected, directive.type_id
                    )),
                });
            }
        }

        if let Some(alias) = &directive.alias {
            self.references.declare(alias, path)?;
        }

        let references = self.references.scan(&directive.params, self.parser);
        tracing::trace!(
            path = %path,
            type_id = %directive.type_id,
            alias = ?directive.alias,
            references = references.len(),
            "discovered directive"
        );

        self.nodes.push(DirectiveNode {
            path: path.clone(),
            ordinal: self.nodes.len(),
            descriptor,
            alias: directive.alias,
            params: directive.params.clone(),
            references,
            element_type: element_type.map(str::to_string),
        });

        // Children still need visiting: inline directives live in the params.
        Ok(Visit::Descend(Node::Fields(directive.params)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::directive::{DefaultDirectiveParser, ReferenceSyntax};
    use crate::engine::registry::{TypeCatalog, TypeRegistry};
    use crate::engine::walker::{ElementTypes, Walker};
    use serde_json::json;

    fn registry() -> TypeRegistry {
        let catalog = TypeCatalog::new();
        catalog.register("svc", |_params| Ok(()));
        catalog.register("cache", |_params| Ok(()));
        catalog.snapshot()
    }

    fn discover(
        doc: serde_json::Value,
        hints: &ElementTypes,
    ) -> BuildResult<(Node, Vec<DirectiveNode>, ReferenceIndex)> {
        let parser = DefaultDirectiveParser::default();
        let registry = registry();
        let mut discovery =
            Discovery::new(&parser, &registry, ReferenceIndex::new(ReferenceSyntax::default()));
        let stripped = Walker::new(hints).walk(Node::from_json(doc), &mut discovery)?;
        let (nodes, index) = discovery.finish();
        Ok((stripped, nodes, index))
    }

    #[test]
    fn test_discovers_nested_and_inline_directives() {
        let (stripped, nodes, index) = discover(
            json!({
                "a": {"@": "svc:main", "x": 1, "cache": {"@": "cache", "size": 3}},
                "list": [{"@": "svc"}, 4],
                "b": "$main"
            }),
            &ElementTypes::new(),
        )
        .unwrap();

        let paths: Vec<&str> = nodes.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "a.cache", "list[0]"]);
        assert_eq!(nodes[0].alias.as_deref(), Some("main"));
        assert_eq!(nodes[1].type_id(), "cache");
        assert_eq!(nodes.iter().map(|n| n.ordinal).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(index.aliases().get("main").unwrap().as_str(), "a");

        // Directive keys never survive into the stripped document.
        assert_eq!(
            stripped.to_json().unwrap(),
            json!({
                "a": {"x": 1, "cache": {"size": 3}},
                "list": [{}, 4],
                "b": "$main"
            })
        );
    }

    #[test]
    fn test_raw_params_keep_inline_directives() {
        let (_, nodes, _) = discover(
            json!({"a": {"@": "svc", "cache": {"@": "cache"}, "dep": "$later"}}),
            &ElementTypes::new(),
        )
        .unwrap();
        let parent = &nodes[0];
        assert!(parent.params.get("cache").unwrap().as_fields().unwrap().contains("@"));
        assert_eq!(parent.references, vec!["later"]);
    }

    #[test]
    fn test_unknown_type() {
        let err = discover(json!({"a": {"@": "nope"}}), &ElementTypes::new()).unwrap_err();
        assert!(matches!(err, BuildError::UnknownType { ref type_id, .. } if type_id == "nope"));
    }

    #[test]
    fn test_format_error_carries_path() {
        let err = discover(json!({"a": [{"@": "svc:"}]}), &ElementTypes::new()).unwrap_err();
        match err {
            BuildError::Format { path, .. } => assert_eq!(path.as_str(), "a[0]"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_alias_across_depths() {
        let err = discover(
            json!({"a": {"@": "svc:x"}, "b": {"deep": [{"@": "cache:x"}]}}),
            &ElementTypes::new(),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateAlias { ref alias, .. } if alias == "x"));
    }

    #[test]
    fn test_element_type_recorded_and_enforced() {
        let hints = ElementTypes::new().sequence("services", "svc");
        let (_, nodes, _) =
            discover(json!({"services": [{"@": "svc"}, {"@": "svc"}]}), &hints).unwrap();
        assert!(nodes.iter().all(|n| n.element_type.as_deref() == Some("svc")));

        let err = discover(json!({"services": [{"@": "svc"}, {"@": "cache"}]}), &hints)
            .unwrap_err();
        match err {
            BuildError::Decode { path, .. } => assert_eq!(path.as_str(), "services[1]"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_root_directive() {
        let (_, nodes, _) = discover(json!({"@": "svc:root"}), &ElementTypes::new()).unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].path.is_root());
    }
}
