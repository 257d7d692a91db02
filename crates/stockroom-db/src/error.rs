//! # Database Error Types
//!
//! Every failure an aggregate operation can produce, classified so the
//! boundary layer never sees a raw driver error.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError / IntegrityViolation (stockroom-core)                 │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← classified by ErrorKind                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ErrorBody ← serialized for the HTTP boundary                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  400 validation/integrity • 404 not found • 409 conflict • 500 storage │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use stockroom_core::{IntegrityViolation, ValidationError};

/// Coarse classification of a [`DbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Client data failed a field rule. Storage untouched.
    Validation,
    /// A cross-entity invariant failed. Storage untouched.
    Integrity,
    /// The root or child id does not exist (or belongs to another root).
    NotFound,
    /// A uniquely-named entity already exists.
    Conflict,
    /// Underlying storage failure; the transaction was rolled back.
    Storage,
}

/// Aggregate and database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A request or patch value failed validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A cross-entity invariant failed.
    #[error("Integrity violation: {0}")]
    Integrity(#[from] IntegrityViolation),

    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Root id doesn't exist
    /// - Child id doesn't exist under the stated root
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: i64 },

    /// Duplicate name detected before writing.
    #[error("{entity} already exists with id {existing_id}")]
    Conflict { entity: String, existing_id: i64 },

    /// Unique constraint violation not caught by a pre-write check.
    #[error("Duplicate {field}")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: i64) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id,
        }
    }

    /// Creates a Conflict error pointing at the existing row.
    pub fn conflict(entity: impl Into<String>, existing_id: i64) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            existing_id,
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Validation(_) => ErrorKind::Validation,
            DbError::Integrity(_) => ErrorKind::Integrity,
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::Conflict { .. } => ErrorKind::Conflict,
            _ => ErrorKind::Storage,
        }
    }

    /// Machine-stable error code.
    ///
    /// ```text
    /// Validation / Integrity → the rule's own code ("postal_code_length")
    /// NotFound               → "<entity>_not_found"
    /// Conflict               → "<entity>_exists"
    /// storage variants       → "storage_error"
    /// ```
    pub fn code(&self) -> String {
        match self {
            DbError::Validation(e) => e.code.clone(),
            DbError::Integrity(e) => e.code.clone(),
            DbError::NotFound { entity, .. } => format!("{}_not_found", entity),
            DbError::Conflict { entity, .. } => format!("{}_exists", entity),
            _ => "storage_error".to_string(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
///
/// `RowNotFound` is never produced by a lookup the repositories expect to
/// miss (those use `fetch_optional`), so it lands in `Internal`.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { field }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Boundary Representation
// =============================================================================

/// Serializable error body for the HTTP boundary.
///
/// ## Serialization
/// ```json
/// { "kind": "conflict", "code": "category_exists",
///   "message": "category already exists with id 3",
///   "entityName": "category", "existingId": 3 }
/// ```
///
/// Storage failures are logged and replaced by a generic message so driver
/// details never reach the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_id: Option<i64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, i64>,
}

impl From<&DbError> for ErrorBody {
    fn from(err: &DbError) -> Self {
        let mut body = ErrorBody {
            kind: err.kind(),
            code: err.code(),
            message: err.to_string(),
            entity_name: None,
            existing_id: None,
            context: BTreeMap::new(),
        };
        match err {
            DbError::Validation(e) => body.message = e.message.clone(),
            DbError::Integrity(e) => {
                body.message = e.message.clone();
                body.context = e.context.clone();
            }
            DbError::NotFound { entity, .. } => body.entity_name = Some(entity.clone()),
            DbError::Conflict {
                entity,
                existing_id,
            } => {
                body.entity_name = Some(entity.clone());
                body.existing_id = Some(*existing_id);
            }
            other => {
                tracing::error!(error = %other, "Storage failure");
                body.message = "Database operation failed".to_string();
            }
        }
        body
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
