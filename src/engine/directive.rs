//! Directive recognition and alias-reference syntax
//!
//! A directive is a field container carrying the reserved directive key, whose
//! value is `"<type-id>"` or `"<type-id>:<alias>"`. Everything else in the
//! container is the parameter map. Alias references are string scalars of the
//! form `"$<alias>"`; `"$$..."` escapes a literal leading `$`.

use super::node::{Fields, Node};

/// A decoded directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Registered type identifier
    pub type_id: String,
    /// Declared alias, if any
    pub alias: Option<String>,
    /// Remaining sibling fields, directive key removed
    pub params: Fields,
}

/// Outcome of running a parser over a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Recognized {
    /// The node is not a directive and is handed back unchanged
    NotADirective(Node),
    /// The node is a directive
    Directive(Directive),
}

/// Recognizes directive nodes.
///
/// Implementations must hand non-directive nodes back untouched and strip the
/// directive key from directive nodes. The `Err` string describes a malformed
/// directive value.
pub trait DirectiveParser: Send + Sync {
    /// Inspect a node.
    fn recognize(&self, node: Node) -> Result<Recognized, String>;

    /// Whether the node carries the directive key, without consuming it.
    fn is_directive(&self, node: &Node) -> bool;
}

/// Parser for the `{"@": "type:alias", ...}` shape.
#[derive(Debug, Clone)]
pub struct DefaultDirectiveParser {
    key: String,
    separator: char,
}

impl DefaultDirectiveParser {
    /// Create a parser for the given directive key and alias separator.
    pub fn new(key: impl Into<String>, separator: char) -> Self {
        Self {
            key: key.into(),
            separator,
        }
    }

    /// The reserved directive key.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn parse_value(&self, value: &Node) -> Result<(String, Option<String>), String> {
        let text = value.as_str().ok_or_else(|| {
            format!(
                "value of '{}' must be a string, found {}",
                self.key,
                value.kind()
            )
        })?;

        let (type_id, alias) = match text.split_once(self.separator) {
            Some((type_id, alias)) => (type_id, Some(alias)),
            None => (text, None),
        };

        check_name("type id", type_id, text)?;
        if let Some(alias) = alias {
            check_name("alias", alias, text)?;
            if alias.contains(self.separator) {
                return Err(format!(
                    "'{}' contains more than one '{}'",
                    text, self.separator
                ));
            }
        }

        Ok((type_id.to_string(), alias.map(str::to_string)))
    }
}

fn check_name(what: &str, name: &str, whole: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("empty {} in '{}'", what, whole));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(format!("{} in '{}' contains whitespace", what, whole));
    }
    Ok(())
}

impl Default for DefaultDirectiveParser {
    fn default() -> Self {
        Self::new("@", ':')
    }
}

impl DirectiveParser for DefaultDirectiveParser {
    fn recognize(&self, node: Node) -> Result<Recognized, String> {
        let mut fields = match node {
            Node::Fields(fields) if fields.contains(&self.key) => fields,
            other => return Ok(Recognized::NotADirective(other)),
        };

        let value = fields.remove(&self.key).unwrap_or(Node::Null);
        let (type_id, alias) = self.parse_value(&value)?;
        Ok(Recognized::Directive(Directive {
            type_id,
            alias,
            params: fields,
        }))
    }

    fn is_directive(&self, node: &Node) -> bool {
        node.as_fields()
            .map(|fields| fields.contains(&self.key))
            .unwrap_or(false)
    }
}

/// How a string scalar reads under the alias-reference syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar<'a> {
    /// Plain string
    Plain,
    /// Reference to the named alias
    Reference(&'a str),
    /// Escaped literal; the payload is the unescaped text
    Escaped(String),
}

/// Alias-reference syntax (`$name`, `$$literal`).
#[derive(Debug, Clone)]
pub struct ReferenceSyntax {
    prefix: String,
}

impl ReferenceSyntax {
    /// Create the syntax for a reference prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Classify a string scalar.
    pub fn classify<'a>(&self, text: &'a str) -> Scalar<'a> {
        if self.prefix.is_empty() {
            return Scalar::Plain;
        }
        let Some(rest) = text.strip_prefix(self.prefix.as_str()) else {
            return Scalar::Plain;
        };
        if rest.starts_with(self.prefix.as_str()) {
            return Scalar::Escaped(rest.to_string());
        }
        if rest.is_empty() {
            Scalar::Plain
        } else {
            Scalar::Reference(rest)
        }
    }

    /// Render a reference to `alias`.
    pub fn reference(&self, alias: &str) -> String {
        format!("{}{}", self.prefix, alias)
    }
}

impl Default for ReferenceSyntax {
    fn default() -> Self {
        Self::new("$")
    }
}
