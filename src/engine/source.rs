//! Document acquisition helpers
//!
//! Thin wrappers over `serde_json` that produce a [`Node`] tree with field
//! order preserved. The engine itself never touches the filesystem.

use std::fs;
use std::path::Path;

use super::error::{LoadError, LoadResult};
use super::node::Node;

/// Parse a JSON document from text.
pub fn parse_document(text: &str) -> LoadResult<Node> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    Ok(Node::from_json(value))
}

/// Read and parse a JSON document from disk.
pub fn load_document(path: &Path) -> LoadResult<Node> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document = parse_document(&text)?;
    tracing::debug!(path = %path.display(), "loaded document");
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_document_keeps_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.json");
        fs::write(&path, r#"{"z": 1, "a": {"@": "svc:main"}, "m": "$main"}"#).unwrap();

        let doc = load_document(&path).unwrap();
        let keys: Vec<&str> = doc.as_fields().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_comments_are_rejected() {
        let err = parse_document("{ // comment\n \"a\": 1 }").unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }

    #[test]
    fn test_unicode_survives() {
        let doc = parse_document(r#"{"name": "测试服务_🚀"}"#).unwrap();
        assert_eq!(
            doc.as_fields().unwrap().get("name").unwrap().as_str(),
            Some("测试服务_🚀")
        );
    }
}
