//! Error types for sqlweave

use thiserror::Error;

/// Result type alias for sqlweave operations
pub type Result<T> = std::result::Result<T, SqlWeaveError>;

/// Unified error type for all sqlweave operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SqlWeaveError {
    /// A clause needs a capability the active dialect does not have.
    #[error("{feature} is not supported by {dialect}: {hint}")]
    UnsupportedFeature {
        feature: String,
        dialect: String,
        hint: String,
    },

    /// The caller used an operation in a context where it can never be valid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A relation kind cannot serve the requested operation.
    #[error("Relation kind {kind} does not support {operation}")]
    UnsupportedRelation { kind: String, operation: String },

    /// The attribute-access collaborator rejected a read or write.
    #[error("Failed to map attribute '{attribute}': {reason}")]
    AttributeMapping { attribute: String, reason: String },

    /// A polymorphic discriminator has no registered table.
    #[error("Morph type '{0}' is not registered in the morph map")]
    MorphTypeUnresolved(String),

    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    #[error("Dialect '{0}' is known but not licensed")]
    UnlicensedDialect(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SqlWeaveError {
    /// Shorthand for an unsupported-feature error.
    pub fn unsupported(feature: &str, dialect: &str, hint: &str) -> Self {
        SqlWeaveError::UnsupportedFeature {
            feature: feature.to_string(),
            dialect: dialect.to_string(),
            hint: hint.to_string(),
        }
    }

    /// Returns true if this error is potentially retryable.
    ///
    /// Nothing the query compiler raises is: re-running a malformed or
    /// unsupported query produces the same failure.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Returns true if the error concerns dialect selection or capabilities
    pub fn is_dialect_error(&self) -> bool {
        matches!(
            self,
            SqlWeaveError::UnsupportedFeature { .. }
                | SqlWeaveError::UnknownDialect(_)
                | SqlWeaveError::UnlicensedDialect(_)
        )
    }

    /// Name of the missing feature for unsupported-feature errors
    pub fn feature(&self) -> Option<&str> {
        match self {
            SqlWeaveError::UnsupportedFeature { feature, .. } => Some(feature),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SqlWeaveError {
    fn from(err: serde_json::Error) -> Self {
        SqlWeaveError::Serialization(err.to_string())
    }
}
