//! Error types for pgrec

use thiserror::Error;

/// Result type alias for pgrec operations
pub type RecordResult<T> = Result<T, RecordError>;

/// Error types for database and record operations
#[derive(Debug, Error)]
pub enum RecordError {
    /// A data operation was attempted before `Connector::connect`
    #[error("Not connected: call Connector::connect first")]
    NotConnected,

    /// Pool construction or acquisition error (after the one retry)
    #[error("Pool error: {0}")]
    Pool(String),

    /// Database connection configuration error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found (e.g. update-by-id for an absent row)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation reported by the database
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// A unique-identifying field is absent in strict mode
    #[error("Required key missing: {0}")]
    RequiredKey(String),

    /// A filter value is an empty list; the query can never match
    #[error("Empty IN list: no matching rows possible")]
    EmptyRows,

    /// An update would alias unique-key values already owned by another row
    #[error("Uniqueness conflict: values already owned by record {id}")]
    UniqueConflict { id: i64 },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl RecordError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a uniqueness conflict from the record facade
    pub fn is_unique_conflict(&self) -> bool {
        matches!(self, Self::UniqueConflict { .. })
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Parse a tokio_postgres error into a more specific RecordError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

impl From<deadpool_postgres::PoolError> for RecordError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
