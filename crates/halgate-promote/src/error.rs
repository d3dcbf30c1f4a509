//! Promotion errors.
//!
//! Gate violations are not errors: they end up in the report. These variants
//! cover broken rule sets, unsafe paths and I/O during the commit phase.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromoteError {
    #[error("unsafe path '{path}': {reason}")]
    UnsafePath { path: String, reason: String },

    #[error("invalid rule set: {0}")]
    InvalidRules(String),

    #[error("rules parse error: {0}")]
    RulesParse(#[from] toml::de::Error),

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("digest mismatch for {path}: draft {expected}, staged {actual}")]
    DigestMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PromoteError {
    /// Wrap an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PromoteError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn unsafe_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        PromoteError::UnsafePath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for promotion operations.
pub type Result<T> = std::result::Result<T, PromoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err = PromoteError::io(
            "/out/hardware/x.rc",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/out/hardware/x.rc"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_digest_mismatch_display() {
        let err = PromoteError::DigestMismatch {
            path: "a/b.te".into(),
            expected: "aa".into(),
            actual: "bb".into(),
        };
        assert_eq!(err.to_string(), "digest mismatch for a/b.te: draft aa, staged bb");
    }
}
