//! Error types for the persistence layer.
//!
//! Errors are grouped by category: resource state, criteria compilation,
//! validation, backend failures and search-mirror synchronisation. Only the
//! first four ever surface from a service call; [`SyncError`] is recorded and
//! logged by the mirror bookkeeping and never returned to a caller.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all persistence operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Criteria compilation and query-string parsing errors
    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Search mirror synchronisation errors
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("resource not found: {resource_type}/{id}")]
    NotFound { resource_type: String, id: String },

    #[error("a new {resource_type} cannot already have an id: {id}")]
    IdentifierAlreadyAssigned { resource_type: String, id: String },

    #[error("{resource_type} has no id")]
    MissingIdentifier { resource_type: String },
}

/// Errors raised while compiling or parsing criteria.
///
/// These are programming errors on the caller's side: they are detected
/// before the primary store is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("unknown field '{field}' for {resource_type}")]
    UnknownField { resource_type: String, field: String },

    #[error("field '{field}' of {resource_type} cannot be filtered")]
    FieldNotFilterable { resource_type: String, field: String },

    #[error("{resource_type} has no {relation} relation")]
    NoSuchRelation {
        resource_type: String,
        relation: String,
    },

    #[error("operator '{operator}' is not supported for {field_type} field '{field}'")]
    UnsupportedOperator {
        field: String,
        operator: String,
        field_type: String,
    },

    #[error("field '{field}' expects a {expected} value, got {actual}")]
    ValueTypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("'{value}' is not a valid value for field '{field}' (allowed: {allowed})")]
    UnknownEnumVariant {
        field: String,
        value: String,
        allowed: String,
    },

    #[error("invalid value '{value}' for '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    #[error("malformed query parameter '{parameter}': {message}")]
    MalformedParameter { parameter: String, message: String },

    #[error("more than one filter given for field '{field}'")]
    DuplicateFilter { field: String },

    #[error("cannot sort {resource_type} by '{field}'")]
    UnknownSortField { resource_type: String, field: String },
}

/// Validation errors for record content.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("missing required field '{field}' on {resource_type}")]
    MissingRequiredField { resource_type: String, field: String },

    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("invalid configuration value for {key}: {message}")]
    InvalidConfiguration { key: String, message: String },
}

/// Backend-specific errors.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    #[error("query error: {message}")]
    QueryError { message: String },

    #[error("serialization error: {message}")]
    SerializationError { message: String },

    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Errors raised when the search mirror could not follow a primary-store write.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    #[error("failed to {operation} {resource_type}/{id} in the search index: {message}")]
    IndexSyncFailure {
        resource_type: String,
        id: String,
        operation: String,
        message: String,
    },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            return StorageError::Validation(ValidationError::ConstraintViolation {
                message: err.to_string(),
            });
        }
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}

#[cfg(feature = "elasticsearch")]
impl From<elasticsearch::Error> for StorageError {
    fn from(err: elasticsearch::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "elasticsearch".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}
