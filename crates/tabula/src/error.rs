//! Error types for the table engine.
//!
//! [`TableError`] is what the individual components return. Public entry points
//! on [`TableEngine`](crate::TableEngine) never surface it directly: failures are
//! classified by [`TableError::kind`] and handed to the
//! [`ErrorHandler`](crate::ErrorHandler), which turns them into a usable result
//! plus an [`ErrorReport`](crate::ErrorReport).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy shared by errors and reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Malformed or missing table configuration.
    Config,
    /// Data or configuration violating the schema.
    Validation,
    /// Failure while producing the transformed output.
    Rendering,
    /// Anomalous but schema-valid input.
    Data,
    /// Unclassified or infrastructure failure.
    System,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Validation => "validation",
            ErrorKind::Rendering => "rendering",
            ErrorKind::Data => "data",
            ErrorKind::System => "system",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the engine's components.
#[derive(Debug, Error)]
pub enum TableError {
    /// No declaration exists for the requested table type.
    #[error("no configuration declared for table type '{0}'")]
    ConfigNotFound(String),

    /// A declaration exists but could not be parsed or loaded.
    #[error("failed to load configuration for '{table_type}': {message}")]
    ConfigLoad { table_type: String, message: String },

    /// A configuration failed schema validation.
    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    /// Row data failed structural validation.
    #[error("invalid table data: {}", .0.join("; "))]
    InvalidData(Vec<String>),

    /// A merge directive cannot be applied to the configured columns.
    #[error("invalid merge directive: {0}")]
    InvalidMerge(String),

    /// Nested records go deeper than the configured limit.
    #[error("nested records exceed maximum depth of {max_depth}")]
    NestingTooDeep { max_depth: usize },

    /// Generic rendering failure.
    #[error("rendering failed: {0}")]
    Rendering(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl TableError {
    /// Classifies this error into the engine's failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::ConfigNotFound(_) | TableError::ConfigLoad { .. } => ErrorKind::Config,
            TableError::InvalidConfig(_) => ErrorKind::Validation,
            TableError::InvalidData(_) => ErrorKind::Validation,
            TableError::InvalidMerge(_)
            | TableError::NestingTooDeep { .. }
            | TableError::Rendering(_)
            | TableError::Template(_) => ErrorKind::Rendering,
            TableError::Json(_) | TableError::Yaml(_) => ErrorKind::Data,
            TableError::Io(_) => ErrorKind::System,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, TableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TableError::ConfigNotFound("basic_info".to_string());
        assert!(err.to_string().contains("basic_info"));

        let err = TableError::InvalidConfig(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "invalid configuration: a; b");
    }

    #[test]
    fn error_kinds() {
        assert_eq!(
            TableError::ConfigNotFound("x".into()).kind(),
            ErrorKind::Config
        );
        assert_eq!(
            TableError::InvalidConfig(vec![]).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            TableError::NestingTooDeep { max_depth: 3 }.kind(),
            ErrorKind::Rendering
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(TableError::from(io).kind(), ErrorKind::System);
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&ErrorKind::Rendering).unwrap();
        assert_eq!(json, "\"rendering\"");
    }
}
