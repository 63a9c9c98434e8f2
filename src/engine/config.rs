//! Resolver configuration
//!
//! Syntax knobs for directives and references. Persisted as JSON; missing
//! fields fall back to the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

use super::directive::{DefaultDirectiveParser, ReferenceSyntax};
use super::error::{LoadError, LoadResult};

/// Configuration for a [`Resolver`](super::Resolver)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Reserved key marking a directive node
    pub directive_key: String,

    /// Separator between type id and alias in a directive value
    pub alias_separator: char,

    /// Prefix marking a string scalar as an alias reference
    pub reference_prefix: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            directive_key: "@".to_string(),
            alias_separator: ':',
            reference_prefix: "$".to_string(),
        }
    }
}

impl ResolverConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> LoadResult<Self> {
        let data = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Write configuration to a JSON file.
    ///
    /// Writes a temporary sibling first, then renames it into place.
    pub fn save(&self, path: &Path) -> LoadResult<()> {
        let data = serde_json::to_vec_pretty(self)?;
        let temp_path = path.with_extension("tmp");
        let io_err = |source: std::io::Error| LoadError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = fs::File::create(&temp_path).map_err(io_err)?;
        file.write_all(&data).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&temp_path, path).map_err(io_err)?;
        Ok(())
    }

    /// Directive parser for this configuration.
    pub fn parser(&self) -> DefaultDirectiveParser {
        DefaultDirectiveParser::new(self.directive_key.clone(), self.alias_separator)
    }

    /// Reference syntax for this configuration.
    pub fn reference_syntax(&self) -> ReferenceSyntax {
        ReferenceSyntax::new(self.reference_prefix.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resolver.json");

        let config = ResolverConfig {
            directive_key: "$mirror".to_string(),
            alias_separator: '#',
            reference_prefix: "&".to_string(),
        };
        config.save(&path).unwrap();

        let loaded = ResolverConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!temp.path().join("resolver.tmp").exists());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resolver.json");
        std::fs::write(&path, br#"{"directive_key": "kind"}"#).unwrap();

        let loaded = ResolverConfig::load(&path).unwrap();
        assert_eq!(loaded.directive_key, "kind");
        assert_eq!(loaded.alias_separator, ':');
        assert_eq!(loaded.reference_prefix, "$");
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = ResolverConfig::load(&temp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
