//! Domain-level error taxonomy for halgate.
//!
//! Validation itself never fails: tool absence, tool faults and timeouts are
//! folded into a [`ValidatorResult`](super::ValidatorResult). The variants here
//! cover the few places where a caller genuinely has to handle an error.

/// halgate domain errors.
#[derive(Debug, thiserror::Error)]
pub enum HalgateError {
    #[error("unknown artifact type '{given}' (valid types: {})", valid.join(", "))]
    UnknownArtifactType { given: String, valid: Vec<&'static str> },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unsafe path '{path}': {reason}")]
    UnsafePath { path: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for halgate domain operations.
pub type Result<T> = std::result::Result<T, HalgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_artifact_type_lists_valid_types() {
        let err = HalgateError::UnknownArtifactType {
            given: "rust".to_string(),
            valid: vec!["aidl", "cpp"],
        };
        let msg = err.to_string();
        assert!(msg.contains("'rust'"));
        assert!(msg.contains("aidl, cpp"));
    }

    #[test]
    fn test_unsafe_path_display() {
        let err = HalgateError::UnsafePath {
            path: "../etc/passwd".to_string(),
            reason: "parent traversal".to_string(),
        };
        assert!(err.to_string().contains("../etc/passwd"));
        assert!(err.to_string().contains("parent traversal"));
    }
}
