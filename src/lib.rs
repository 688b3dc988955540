//! SQLite data access for Runar services.
//!
//! # Intention
//!
//! - Provide one small async facade over a file-backed SQLite database.
//! - Route raw SQL to either a read (`SELECT`) or a mutation
//!   (`INSERT`/`UPDATE`/`DELETE`/`CREATE`) and reject the wrong kind early.
//! - Encapsulate connection handling, directory creation and error mapping.
//!
//! # Architectural Boundaries
//!
//! - No query builder, schema management, migrations, pooling or
//!   transactions. Callers hand in complete SQL text.
//! - Statement classification looks at the first space-delimited word only.
//!   Leading whitespace, comments and multi-statement batches are not
//!   normalized and will be misclassified.
//!
//! # Usage
//!
//! ```no_run
//! use rust_sqlite_access::{Database, Executor};
//!
//! # async fn demo() -> Result<(), rust_sqlite_access::DbError> {
//! let db = Database::open("var/app/state.sqlite3");
//! db.execute("CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)").await?;
//! let id = db.execute("INSERT INTO t(v) VALUES('a')").await?;
//! let row = db.query_one("SELECT * FROM t").await?;
//! assert_eq!(row.get("id").and_then(|v| v.as_i64()), Some(id));
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod statement;
mod value;

pub mod sqlite;

pub use config::{DatabaseConfig, DEFAULT_BUSY_TIMEOUT};
pub use error::{DbError, ErrorKind, Result};
pub use sqlite::{Database, Executor, Session};
pub use statement::{Statement, StatementKind};
pub use value::{Row, Value};
