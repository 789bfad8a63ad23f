//! Error types for the data layer.
//!
//! Store methods work in [`DbError`], which wraps the underlying [`sqlx`]
//! errors. At the repository port boundary it is translated into
//! [`RepoError`] by inspecting the `PostgreSQL` SQLSTATE.

use koin_economy::RepoError;

/// SQLSTATE for a unique or primary key violation.
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for a CHECK constraint violation.
const CHECK_VIOLATION: &str = "23514";
/// SQLSTATE for a numeric value out of range (BIGINT overflow).
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be turned into a domain record.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A value could not be written because it does not fit the column.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// The SQLSTATE of a database-side error, if any.
    fn sqlstate(&self) -> Option<String> {
        match self {
            Self::Postgres(err) => err
                .as_database_error()
                .and_then(|db| db.code())
                .map(std::borrow::Cow::into_owned),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(err: DbError) -> Self {
        match err.sqlstate().as_deref() {
            Some(UNIQUE_VIOLATION) => return Self::Duplicate(err.to_string()),
            Some(CHECK_VIOLATION | NUMERIC_OUT_OF_RANGE) => {
                return Self::Constraint(err.to_string());
            }
            _ => {}
        }
        match err {
            DbError::Decode(msg) => Self::Corrupt(msg),
            DbError::OutOfRange(msg) => Self::Constraint(msg),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_map_by_variant() {
        assert!(matches!(
            RepoError::from(DbError::Decode(String::from("bad category"))),
            RepoError::Corrupt(_)
        ));
        assert!(matches!(
            RepoError::from(DbError::OutOfRange(String::from("target"))),
            RepoError::Constraint(_)
        ));
        assert!(matches!(
            RepoError::from(DbError::Postgres(sqlx::Error::PoolTimedOut)),
            RepoError::Unavailable(_)
        ));
    }
}
