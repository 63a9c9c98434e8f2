//! Alias declarations and reference scanning
//!
//! Aliases are document-global and case-sensitive. The index lives for one
//! build; scanning does not consult declarations, so forward references are
//! accepted here and checked once discovery has seen the whole document.

use indexmap::IndexMap;
use serde::Serialize;

use super::directive::{DirectiveParser, ReferenceSyntax, Scalar};
use super::error::{BuildError, BuildResult};
use super::node::{Fields, Node};
use super::path::StructuralPath;

/// Alias → declaring path, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AliasIndex {
    entries: IndexMap<String, StructuralPath>,
}

impl AliasIndex {
    /// Path of the directive declaring `alias`.
    pub fn get(&self, alias: &str) -> Option<&StructuralPath> {
        self.entries.get(alias)
    }

    /// Whether `alias` is declared.
    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// Declared aliases with their paths, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StructuralPath)> {
        self.entries.iter().map(|(alias, path)| (alias.as_str(), path))
    }

    /// Number of aliases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no alias is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-build alias table plus the reference syntax used to scan parameters.
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    syntax: ReferenceSyntax,
    aliases: AliasIndex,
}

impl ReferenceIndex {
    /// Create an empty index.
    pub fn new(syntax: ReferenceSyntax) -> Self {
        Self {
            syntax,
            aliases: AliasIndex::default(),
        }
    }

    /// The reference syntax in use.
    pub fn syntax(&self) -> &ReferenceSyntax {
        &self.syntax
    }

    /// Record that `path` declares `alias`.
    pub fn declare(&mut self, alias: &str, path: &StructuralPath) -> BuildResult<()> {
        if let Some(first) = self.aliases.entries.get(alias) {
            return Err(BuildError::DuplicateAlias {
                alias: alias.to_string(),
                first: first.clone(),
                second: path.clone(),
            });
        }
        self.aliases
            .entries
            .insert(alias.to_string(), path.clone());
        Ok(())
    }

    /// Path declaring `alias`. `at` locates the reference for the error.
    pub fn resolve(&self, alias: &str, at: &StructuralPath) -> BuildResult<&StructuralPath> {
        self.aliases
            .get(alias)
            .ok_or_else(|| BuildError::UnknownAlias {
                alias: alias.to_string(),
                path: at.clone(),
            })
    }

    /// Every alias referenced inside `params`, first occurrence order, without
    /// duplicates. Nested directives are not entered; they own their references.
    pub fn scan(&self, params: &Fields, parser: &dyn DirectiveParser) -> Vec<String> {
        let mut found = Vec::new();
        for (_, value) in params.iter() {
            self.scan_node(value, parser, &mut found);
        }
        found
    }

    fn scan_node(&self, node: &Node, parser: &dyn DirectiveParser, found: &mut Vec<String>) {
        if parser.is_directive(node) {
            return;
        }
        match node {
            Node::String(text) => {
                if let Scalar::Reference(alias) = self.syntax.classify(text) {
                    if !found.iter().any(|seen| seen == alias) {
                        found.push(alias.to_string());
                    }
                }
            }
            Node::Sequence(items) => {
                for item in items {
                    self.scan_node(item, parser, found);
                }
            }
            Node::Fields(fields) => {
                for (_, value) in fields.iter() {
                    self.scan_node(value, parser, found);
                }
            }
            Node::Null | Node::Bool(_) | Node::Number(_) | Node::Instance(_) => {}
        }
    }

    /// Read-only view of the declarations.
    pub fn aliases(&self) -> &AliasIndex {
        &self.aliases
    }

    /// Consume the index, keeping the declarations.
    pub fn into_aliases(self) -> AliasIndex {
        self.aliases
    }
}
