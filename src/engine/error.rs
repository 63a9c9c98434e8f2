//! Error types for the build engine
//!
//! Every build stage fails fast with a `BuildError`; nothing is retried inside
//! the engine. Loading and configuration problems live in `LoadError` so that
//! callers can tell document problems apart from I/O.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::BuildStage;
use super::node::ShapeError;
use super::path::StructuralPath;
use super::registry::ValidationError;

/// Terminal failure of one build
#[derive(Debug, Error)]
pub enum BuildError {
    /// Malformed directive value
    #[error("malformed directive at {path}: {detail}")]
    Format {
        /// Path of the offending node
        path: StructuralPath,
        /// What was wrong with the directive value
        detail: String,
    },

    /// Directive names a type the registry does not know
    #[error("unknown type '{type_id}' at {path}")]
    UnknownType {
        /// Path of the directive
        path: StructuralPath,
        /// Unregistered type identifier
        type_id: String,
    },

    /// Alias declared by more than one directive
    #[error("duplicate alias '{alias}': declared at {first} and again at {second}")]
    DuplicateAlias {
        /// The alias
        alias: String,
        /// First declaring path
        first: StructuralPath,
        /// Second declaring path
        second: StructuralPath,
    },

    /// Directive parameters reference an alias nobody declares
    #[error("unresolved reference '{alias}' in parameters of {referenced_by}")]
    UnresolvedReference {
        /// The missing alias
        alias: String,
        /// Directive whose parameters hold the reference
        referenced_by: StructuralPath,
    },

    /// Alias reference outside any directive names an undeclared alias
    #[error("unknown alias '{alias}' at {path}")]
    UnknownAlias {
        /// The missing alias
        alias: String,
        /// Path of the referencing scalar
        path: StructuralPath,
    },

    /// Dependency cycle between directives
    #[error("cyclic reference at {path} (cycle: {})", render_cycle(.cycle))]
    CyclicReference {
        /// A path on the cycle
        path: StructuralPath,
        /// The cycle, starting and ending at `path`
        cycle: Vec<StructuralPath>,
    },

    /// The registry rejected the parameters of a directive
    #[error("construction of '{type_id}' at {path} failed: {source}")]
    Construction {
        /// Path of the directive
        path: StructuralPath,
        /// Type being constructed
        type_id: String,
        /// Rejection reported by the registry
        #[source]
        source: ValidationError,
    },

    /// The materialized document does not fit the requested shape
    #[error("decode failed at {path}: {source}")]
    Decode {
        /// Path where decoding failed (root for whole-document decoders)
        path: StructuralPath,
        /// Underlying shape mismatch
        #[source]
        source: ShapeError,
    },
}

impl BuildError {
    /// The build stage this error terminates.
    pub fn stage(&self) -> BuildStage {
        match self {
            BuildError::Format { .. }
            | BuildError::UnknownType { .. }
            | BuildError::DuplicateAlias { .. } => BuildStage::Discovering,
            BuildError::UnresolvedReference { .. } => BuildStage::GraphBuilding,
            BuildError::CyclicReference { .. } => BuildStage::Ordering,
            BuildError::Construction { .. } => BuildStage::Resolving,
            BuildError::UnknownAlias { .. } => BuildStage::Materializing,
            BuildError::Decode { path, .. } if !path.is_root() => BuildStage::Discovering,
            BuildError::Decode { .. } => BuildStage::Materializing,
        }
    }
}

fn render_cycle(cycle: &[StructuralPath]) -> String {
    cycle
        .iter()
        .map(|path| path.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Convenience result alias for build operations
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Errors loading documents or configuration from disk
#[derive(Debug, Error)]
pub enum LoadError {
    /// File could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// File content is not valid JSON for the expected type
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for loading operations
pub type LoadResult<T> = std::result::Result<T, LoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_every_path() {
        let a = StructuralPath::root().field("a");
        let b = StructuralPath::root().field("b");
        let err = BuildError::CyclicReference {
            path: a.clone(),
            cycle: vec![a.clone(), b, a],
        };
        assert_eq!(err.to_string(), "cyclic reference at a (cycle: a -> b -> a)");
        assert_eq!(err.stage(), BuildStage::Ordering);
    }

    #[test]
    fn test_root_paths_render_readably() {
        let err = BuildError::UnknownType {
            path: StructuralPath::root(),
            type_id: "svc".into(),
        };
        assert_eq!(err.to_string(), "unknown type 'svc' at <root>");
    }
}
