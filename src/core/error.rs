//! Typed error handling for outpost
//!
//! Callers match on specific failures instead of inspecting strings:
//! a missing entity is a normal [`EntityError::NotFound`], an aborted unit of
//! work is a [`CommitError`], and an undefined security policy at startup is a
//! [`ConfigError`].
//!
//! # Error Categories
//!
//! - [`EntityError`]: Errors related to repository operations (CRUD, relations)
//! - [`CommitError`]: Errors that abort a unit of work
//! - [`ConfigError`]: Errors related to configuration parsing and validation
//! - [`StorageError`]: Errors raised by the in-memory backing collections
//!
//! # Example
//!
//! ```rust,ignore
//! use outpost::prelude::*;
//!
//! match agents.get_by_id(&id) {
//!     Ok(agent) => println!("Found: {:?}", agent),
//!     Err(OutpostError::Entity(EntityError::NotFound { id, .. })) => {
//!         println!("Agent {} not found", id);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// The main error type for outpost
#[derive(Debug)]
pub enum OutpostError {
    /// Entity-related errors (CRUD operations, relation resolution)
    Entity(EntityError),

    /// Unit-of-work commit was aborted
    Commit(CommitError),

    /// Configuration errors
    Config(ConfigError),

    /// Backing store errors
    Storage(StorageError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for OutpostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutpostError::Entity(e) => write!(f, "{}", e),
            OutpostError::Commit(e) => write!(f, "{}", e),
            OutpostError::Config(e) => write!(f, "{}", e),
            OutpostError::Storage(e) => write!(f, "{}", e),
            OutpostError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for OutpostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutpostError::Entity(e) => Some(e),
            OutpostError::Commit(e) => Some(e),
            OutpostError::Config(e) => Some(e),
            OutpostError::Storage(e) => Some(e),
            OutpostError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl OutpostError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            OutpostError::Entity(e) => e.status_code(),
            OutpostError::Commit(e) => e.status_code(),
            OutpostError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OutpostError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OutpostError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            OutpostError::Entity(e) => e.error_code(),
            OutpostError::Commit(e) => e.error_code(),
            OutpostError::Config(_) => "CONFIG_ERROR",
            OutpostError::Storage(_) => "STORAGE_ERROR",
            OutpostError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is the designed "entity absent" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, OutpostError::Entity(EntityError::NotFound { .. }))
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            OutpostError::Entity(EntityError::NotFound { entity_type, id })
            | OutpostError::Entity(EntityError::AlreadyExists { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id.to_string()
                }))
            }
            OutpostError::Commit(CommitError::StaleIdentifier {
                entity_type,
                id,
                operation,
            }) => Some(serde_json::json!({
                "entity_type": entity_type,
                "id": id.to_string(),
                "operation": operation
            })),
            OutpostError::Commit(CommitError::DuplicateIdentifier { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id.to_string()
                }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for OutpostError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity operations
#[derive(Debug)]
pub enum EntityError {
    /// Entity was not found (also reported for broken relations)
    NotFound { entity_type: String, id: Uuid },

    /// Entity with this identifier is already visible to the unit of work
    AlreadyExists { entity_type: String, id: Uuid },

    /// Operation requires an identifier but the entity has none
    MissingIdentifier { entity_type: String },

    /// No entity type is registered under this name
    UnknownType { entity_type: String },

    /// Failed to serialize/deserialize entity
    SerializationError {
        entity_type: String,
        message: String,
    },
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::NotFound { entity_type, id } => {
                write!(f, "{} with id '{}' not found", entity_type, id)
            }
            EntityError::AlreadyExists { entity_type, id } => {
                write!(f, "{} with id '{}' already exists", entity_type, id)
            }
            EntityError::MissingIdentifier { entity_type } => {
                write!(f, "{} has no identifier", entity_type)
            }
            EntityError::UnknownType { entity_type } => {
                write!(f, "Unknown entity type '{}'", entity_type)
            }
            EntityError::SerializationError {
                entity_type,
                message,
            } => {
                write!(
                    f,
                    "Failed to serialize/deserialize {}: {}",
                    entity_type, message
                )
            }
        }
    }
}

impl std::error::Error for EntityError {}

impl EntityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
            EntityError::AlreadyExists { .. } => StatusCode::CONFLICT,
            EntityError::MissingIdentifier { .. } => StatusCode::BAD_REQUEST,
            EntityError::UnknownType { .. } => StatusCode::NOT_FOUND,
            EntityError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::AlreadyExists { .. } => "ENTITY_ALREADY_EXISTS",
            EntityError::MissingIdentifier { .. } => "ENTITY_MISSING_IDENTIFIER",
            EntityError::UnknownType { .. } => "ENTITY_TYPE_NOT_FOUND",
            EntityError::SerializationError { .. } => "ENTITY_SERIALIZATION_ERROR",
        }
    }

    /// Shorthand for a `NotFound` on a statically named entity type
    pub fn not_found(entity_type: &str, id: Uuid) -> Self {
        EntityError::NotFound {
            entity_type: entity_type.to_string(),
            id,
        }
    }

    pub(crate) fn serialization(entity_type: &str, err: serde_json::Error) -> Self {
        EntityError::SerializationError {
            entity_type: entity_type.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<EntityError> for OutpostError {
    fn from(err: EntityError) -> Self {
        OutpostError::Entity(err)
    }
}

// =============================================================================
// Commit Errors
// =============================================================================

/// Errors that abort a unit of work
///
/// When a commit fails none of its mutations are applied.
#[derive(Debug)]
pub enum CommitError {
    /// An update or removal targets an identifier that no longer exists
    StaleIdentifier {
        entity_type: String,
        id: Uuid,
        operation: String,
    },

    /// An add targets an identifier another unit of work committed first
    DuplicateIdentifier { entity_type: String, id: Uuid },

    /// The request was cancelled before the mutations were applied
    Cancelled { pending: usize },
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitError::StaleIdentifier {
                entity_type,
                id,
                operation,
            } => {
                write!(
                    f,
                    "Commit aborted: cannot {} {} '{}', it no longer exists",
                    operation, entity_type, id
                )
            }
            CommitError::DuplicateIdentifier { entity_type, id } => {
                write!(
                    f,
                    "Commit aborted: {} with id '{}' already exists",
                    entity_type, id
                )
            }
            CommitError::Cancelled { pending } => {
                write!(
                    f,
                    "Commit aborted: request cancelled with {} pending mutation(s)",
                    pending
                )
            }
        }
    }
}

impl std::error::Error for CommitError {}

impl CommitError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CommitError::StaleIdentifier { .. } => StatusCode::CONFLICT,
            CommitError::DuplicateIdentifier { .. } => StatusCode::CONFLICT,
            CommitError::Cancelled { .. } => StatusCode::REQUEST_TIMEOUT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CommitError::StaleIdentifier { .. } => "COMMIT_STALE_IDENTIFIER",
            CommitError::DuplicateIdentifier { .. } => "COMMIT_DUPLICATE_IDENTIFIER",
            CommitError::Cancelled { .. } => "COMMIT_CANCELLED",
        }
    }
}

impl From<CommitError> for OutpostError {
    fn from(err: CommitError) -> Self {
        OutpostError::Commit(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Missing required field in configuration
    MissingField { field: String, context: String },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found
    FileNotFound { path: String },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::MissingField { field, context } => {
                write!(f, "Missing required field '{}' in {}", field, context)
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for OutpostError {
    fn from(err: ConfigError) -> Self {
        OutpostError::Config(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by the in-memory backing collections
#[derive(Debug)]
pub enum StorageError {
    /// A collection lock was poisoned by a panicking writer
    LockPoisoned { collection: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::LockPoisoned { collection } => {
                write!(f, "Lock on collection '{}' is poisoned", collection)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl StorageError {
    pub(crate) fn poisoned(collection: &str) -> Self {
        StorageError::LockPoisoned {
            collection: collection.to_string(),
        }
    }
}

impl From<StorageError> for OutpostError {
    fn from(err: StorageError) -> Self {
        OutpostError::Storage(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<std::io::Error> for OutpostError {
    fn from(err: std::io::Error) -> Self {
        OutpostError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for OutpostError {
    fn from(err: serde_yaml::Error) -> Self {
        OutpostError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for outpost operations
pub type OutpostResult<T> = Result<T, OutpostError>;
