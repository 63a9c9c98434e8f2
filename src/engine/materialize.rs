//! Materialization
//!
//! Second walk over the stripped document. Nodes whose path holds a constructed
//! instance are replaced wholesale, alias references become the instance they
//! name, and escaped strings lose their escape. The same visitor resolves
//! directive parameters right before construction.

use super::directive::{ReferenceSyntax, Scalar};
use super::error::{BuildError, BuildResult};
use super::instance::InstanceTable;
use super::node::Node;
use super::path::StructuralPath;
use super::reference::AliasIndex;
use super::walker::{ElementTypes, Visit, Visitor, Walker};

/// Visitor replacing directives and references with instances.
pub struct Substitution<'a> {
    instances: &'a InstanceTable,
    aliases: &'a AliasIndex,
    syntax: &'a ReferenceSyntax,
}

impl<'a> Substitution<'a> {
    /// Create a substitution over the given table and aliases.
    pub fn new(
        instances: &'a InstanceTable,
        aliases: &'a AliasIndex,
        syntax: &'a ReferenceSyntax,
    ) -> Self {
        Self {
            instances,
            aliases,
            syntax,
        }
    }

    fn lookup_alias(&self, alias: &str, path: &StructuralPath) -> BuildResult<Node> {
        self.aliases
            .get(alias)
            .and_then(|target| self.instances.get(target.as_str()))
            .map(|instance| Node::Instance(instance.clone()))
            .ok_or_else(|| BuildError::UnknownAlias {
                alias: alias.to_string(),
                path: path.clone(),
            })
    }
}

impl Visitor for Substitution<'_> {
    type Error = BuildError;

    fn visit(
        &mut self,
        path: &StructuralPath,
        node: Node,
        _element_type: Option<&str>,
    ) -> BuildResult<Visit> {
        if let Some(instance) = self.instances.get(path.as_str()) {
            return Ok(Visit::Replace(Node::Instance(instance.clone())));
        }

        if let Node::String(text) = &node {
            match self.syntax.classify(text) {
                Scalar::Reference(alias) => {
                    return self.lookup_alias(alias, path).map(Visit::Replace);
                }
                Scalar::Escaped(literal) => return Ok(Visit::Replace(Node::String(literal))),
                Scalar::Plain => {}
            }
        }

        Ok(Visit::Descend(node))
    }
}

/// Materialize a stripped document against a finished instance table.
pub fn materialize(
    document: Node,
    instances: &InstanceTable,
    aliases: &AliasIndex,
    syntax: &ReferenceSyntax,
) -> BuildResult<Node> {
    let no_hints = ElementTypes::new();
    let mut substitution = Substitution::new(instances, aliases, syntax);
    Walker::new(&no_hints).walk(document, &mut substitution)
}
