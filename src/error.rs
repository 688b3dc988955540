use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Errors returned by [`crate::Database`] and [`crate::Session`].
#[derive(Debug, Error)]
pub enum DbError {
    /// The statement's leading keyword does not fit the operation.
    #[error("{operation}() expects {expected} statement, got `{keyword}`")]
    Usage {
        operation: &'static str,
        expected: &'static str,
        keyword: String,
    },

    /// The directory holding the database file could not be created.
    #[error("cannot connect to database: failed to create {}: {source}", path.display())]
    DataDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// SQLite could not open the database file.
    #[error("cannot connect to database at {}: {source}", path.display())]
    Connection {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// SQLite rejected or failed the statement.
    #[error("statement failed: {source} (sql: {statement})")]
    Execution {
        statement: String,
        source: rusqlite::Error,
    },

    /// A first-row read matched nothing.
    #[error("query returned no rows (sql: {statement})")]
    EmptyResult { statement: String },

    #[error("database call timed out after {0:?}")]
    Timeout(Duration),

    /// Closing a long-lived connection failed.
    #[error("failed to close database connection: {0}")]
    Close(#[source] rusqlite::Error),

    /// The blocking worker running the statement panicked or was cancelled.
    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Coarse category of a [`DbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Programmer error: wrong statement for the operation.
    Usage,
    /// Environment error: the database could not be reached.
    Connection,
    /// Runtime outcome: the engine refused the statement.
    Execution,
    /// Runtime outcome: no row for a first-row read.
    EmptyResult,
    Timeout,
    Internal,
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Usage { .. } => ErrorKind::Usage,
            DbError::DataDirectory { .. } | DbError::Connection { .. } | DbError::Close(_) => {
                ErrorKind::Connection
            }
            DbError::Execution { .. } => ErrorKind::Execution,
            DbError::EmptyResult { .. } => ErrorKind::EmptyResult,
            DbError::Timeout(_) => ErrorKind::Timeout,
            DbError::Task(_) => ErrorKind::Internal,
        }
    }

    pub fn is_usage(&self) -> bool {
        self.kind() == ErrorKind::Usage
    }

    pub fn is_connection(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }

    pub fn is_execution(&self) -> bool {
        self.kind() == ErrorKind::Execution
    }

    pub fn is_empty_result(&self) -> bool {
        self.kind() == ErrorKind::EmptyResult
    }

    /// The underlying SQLite error, when there is one.
    pub fn sqlite_error(&self) -> Option<&rusqlite::Error> {
        match self {
            DbError::Connection { source, .. } | DbError::Execution { source, .. } => Some(source),
            DbError::Close(source) => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_message_names_operation() {
        let err = DbError::Usage {
            operation: "query",
            expected: "a SELECT",
            keyword: "delete".into(),
        };
        assert_eq!(
            err.to_string(),
            "query() expects a SELECT statement, got `delete`"
        );
        assert!(err.is_usage());
        assert!(err.sqlite_error().is_none());
    }

    #[test]
    fn directory_and_open_failures_share_a_kind() {
        let dir = DbError::DataDirectory {
            path: PathBuf::from("x"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let open = DbError::Connection {
            path: PathBuf::from("x/db"),
            source: rusqlite::Error::InvalidQuery,
        };
        assert!(dir.is_connection());
        assert!(open.is_connection());
        assert!(dir.to_string().starts_with("cannot connect to database"));
        assert!(open.to_string().starts_with("cannot connect to database"));
    }

    #[test]
    fn empty_result_is_not_an_execution_error() {
        let err = DbError::EmptyResult {
            statement: "SELECT 1 WHERE 0".into(),
        };
        assert_eq!(err.kind(), ErrorKind::EmptyResult);
        assert!(!err.is_execution());
    }
}
