use thiserror::Error;

/// Postgres SQLSTATE for `EXCLUDE` constraint violations
const EXCLUSION_VIOLATION: &str = "23P01";
/// Postgres SQLSTATE raised when a SERIALIZABLE transaction loses a read/write race
const SERIALIZATION_FAILURE: &str = "40001";

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    #[error("Unique constraint violation")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error("Foreign key constraint violation")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Two rows collide under an exclusion constraint (double-booked table)
    #[error("Exclusion constraint violation")]
    ExclusionViolation { constraint: Option<String>, message: String },

    /// A concurrent transaction committed first; the whole transaction may be retried
    #[error("Serialization failure")]
    SerializationFailure,

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().map(|s| s.to_string());
                let table = db_err.table().map(|s| s.to_string());
                let message = db_err.message().to_string();

                if db_err.is_unique_violation() {
                    DbError::UniqueViolation { constraint, table, message }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation { constraint, table, message }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation { constraint, table, message }
                } else {
                    match db_err.code().as_deref() {
                        Some(EXCLUSION_VIOLATION) => DbError::ExclusionViolation { constraint, message },
                        Some(SERIALIZATION_FAILURE) => DbError::SerializationFailure,
                        _ => DbError::Other(anyhow::Error::from(err)),
                    }
                }
            }
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
