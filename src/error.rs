//! Error types for spec loading, configuration and generation.
//!
//! Spec and config errors are always raised before the generator touches the
//! filesystem. Filesystem errors abort mid-run; files written earlier in the
//! same run are left in place.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, GenError>;

/// Every failure the generator can report.
#[derive(Debug, Error)]
pub enum GenError {
    /// The spec JSON could not be parsed or has an unsupported top-level shape.
    #[error("unsupported spec format: {0}")]
    SpecFormat(String),

    /// The spec parsed but violates an IR invariant.
    #[error("invalid spec: {0}")]
    SpecInvalid(String),

    /// The config overlay is malformed.
    #[error("invalid config: {0}")]
    Config(String),

    /// An `imports.*` entry is malformed or resolves to the wrong number of names.
    #[error("invalid import target imports.{key} = {value:?}: {reason}")]
    ConfigImportTarget {
        key: String,
        value: String,
        reason: String,
    },

    /// Create/read/write/delete failure on the output tree or an input file.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template rendering failed.
    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

impl GenError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn import_target(key: &str, value: &str, reason: impl Into<String>) -> Self {
        GenError::ConfigImportTarget {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filesystem_error_mentions_path() {
        let err = GenError::fs(
            "/tmp/out/app/models",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out/app/models"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_import_target_error_message() {
        let err = GenError::import_target("base", "app.models.base", "expected module:Name");
        assert_eq!(
            err.to_string(),
            "invalid import target imports.base = \"app.models.base\": expected module:Name"
        );
    }
}
