//! Error handling module for the migration composer
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every failure carries the option, unit or key that caused it, and every
//! variant is terminal for the composition run.

use thiserror::Error;

use crate::units::UnitId;

/// Main error type for the migration composer
#[derive(Error, Debug)]
pub enum ComposerError {
    /// A recognized option carries a malformed or unsupported value,
    /// or the option name is not recognized at all
    #[error("Invalid value for option '{option}': {reason}")]
    Validation { option: String, reason: String },

    /// A required template token has nothing to substitute
    #[error("Template '{template}' has no value for placeholder {placeholder}")]
    MissingPlaceholder {
        template: String,
        placeholder: String,
    },

    /// The static unit catalog contains a cycle or an unknown unit
    #[error("Unit catalog integrity error at '{unit}': {reason}")]
    DependencyIntegrity { unit: UnitId, reason: String },

    /// A unit read a cross-reference that no declared dependency published
    #[error("Unit '{consumer}' read cross-reference '{producer}/{key}' which was never published")]
    CrossReferenceMissing {
        consumer: UnitId,
        producer: UnitId,
        key: String,
    },

    /// A cross-reference key was published a second time
    #[error("Cross-reference '{producer}/{key}' was already published")]
    CrossReferenceConflict { producer: UnitId, key: String },

    /// The provisioner rejected a unit or returned incomplete outputs
    #[error("Provisioning of unit '{unit}' failed: {message}")]
    Provisioning { unit: UnitId, message: String },

    /// Template artifact could not be read
    #[error("Failed to load template '{path}': {source}")]
    TemplateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Context file errors (missing context block, wrong shape)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for composer operations
pub type Result<T> = std::result::Result<T, ComposerError>;

// Convenient error constructors
impl ComposerError {
    /// Create a validation error for a named option
    pub fn validation(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Create a catalog integrity error
    pub fn integrity(unit: UnitId, reason: impl Into<String>) -> Self {
        Self::DependencyIntegrity {
            unit,
            reason: reason.into(),
        }
    }

    /// Create a provisioning error
    pub fn provisioning(unit: UnitId, message: impl Into<String>) -> Self {
        Self::Provisioning {
            unit,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Name of the offending option, if this is a validation failure
    pub fn option(&self) -> Option<&str> {
        match self {
            Self::Validation { option, .. } => Some(option),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ComposerError::validation("engineVersion", "expected ES_x.y or OS_x.y");
        assert_eq!(
            err.to_string(),
            "Invalid value for option 'engineVersion': expected ES_x.y or OS_x.y"
        );

        let err = ComposerError::CrossReferenceMissing {
            consumer: UnitId::FetchMigration,
            producer: UnitId::OpenSearchDomain,
            key: "osClusterEndpoint".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unit 'fetch-migration' read cross-reference 'opensearch-domain/osClusterEndpoint' which was never published"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ComposerError = io_err.into();
        assert!(matches!(err, ComposerError::Io(_)));
    }

    #[test]
    fn test_option_accessor() {
        let err = ComposerError::validation("ebsVolumeType", "bad");
        assert_eq!(err.option(), Some("ebsVolumeType"));

        let err = ComposerError::provisioning(UnitId::Network, "boom");
        assert_eq!(err.option(), None);
    }
}
