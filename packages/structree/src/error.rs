//! Error types for tree construction

use thiserror::Error;

/// Main error type for tree construction
#[derive(Error, Debug)]
pub enum TreeError {
    /// The root document value was not a mapping
    #[error("root content for '{0}' is not a mapping")]
    RootNotMapping(String),

    /// A node's raw content violated a structural contract
    #[error("malformed node at '{path}': {reason}")]
    MalformedNode { path: String, reason: String },

    /// YAML parsing error
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// A build hook reported a failure
    #[error("hook failed: {0}")]
    Hook(String),
}

impl TreeError {
    pub(crate) fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        TreeError::MalformedNode {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for tree operations
pub type Result<T> = std::result::Result<T, TreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TreeError::RootNotMapping("myroot".to_string());
        assert_eq!(err.to_string(), "root content for 'myroot' is not a mapping");
    }

    #[test]
    fn test_malformed_display() {
        let err = TreeError::malformed("root.leaf.group", "sequence element is not a mapping");
        assert_eq!(
            err.to_string(),
            "malformed node at 'root.leaf.group': sequence element is not a mapping"
        );
    }
}
