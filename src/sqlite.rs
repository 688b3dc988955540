//! Connection handling and statement execution.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{parent_dir, DatabaseConfig};
use crate::error::{DbError, Result};
use crate::statement::{Statement, StatementKind};
use crate::value::Row;

/// The two verbs shared by [`Database`] and [`Session`].
///
/// Statements are checked by their leading keyword before any I/O happens.
/// A mismatch fails with [`DbError::Usage`].
#[async_trait]
pub trait Executor {
    /// Run a `SELECT` and return every row, possibly none.
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;

    /// Run a `SELECT` and return its first row.
    ///
    /// An empty result fails with [`DbError::EmptyResult`].
    async fn query_one(&self, sql: &str) -> Result<Row>;

    /// Run an `INSERT`, `UPDATE`, `DELETE` or `CREATE`.
    ///
    /// Inserts return the new rowid. Everything else returns the number of
    /// changed rows as reported by SQLite, which is meaningless for `CREATE`.
    async fn execute(&self, sql: &str) -> Result<i64>;
}

/// Per-call access to one SQLite file.
///
/// Every operation opens a fresh connection, runs one statement on the
/// blocking pool and closes the connection before returning, whether the
/// statement succeeded or not. Use [`Database::session`] to keep one
/// connection across statements.
#[derive(Debug, Clone, Default)]
pub struct Database {
    config: DatabaseConfig,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    /// Shorthand for a default config pointing at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(DatabaseConfig::new(path))
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Point subsequent calls at `path`. An empty path restores the default
    /// `<cwd>/data/database.sqlite3`. Calls already running are unaffected.
    pub fn set_database_path(&mut self, path: impl Into<PathBuf>) {
        self.config.set_path(path);
    }

    /// The file the next call will open.
    pub fn database_path(&self) -> PathBuf {
        self.config.resolved_path()
    }

    /// Open one connection and keep it for the lifetime of the returned session.
    pub async fn session(&self) -> Result<Session> {
        let path = self.config.resolved_path();
        let busy_timeout = self.config.busy_timeout;
        let open_path = path.clone();
        let task =
            tokio::task::spawn_blocking(move || open_connection(&open_path, busy_timeout));
        let conn = join(self.config.call_timeout, task).await?;
        Ok(Session {
            conn: Arc::new(Mutex::new(conn)),
            path,
            call_timeout: self.config.call_timeout,
        })
    }

    async fn run<T, F>(&self, statement: Statement, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &Statement) -> Result<T> + Send + 'static,
    {
        // Resolved now so a later set_database_path does not reach this call.
        let path = self.config.resolved_path();
        let busy_timeout = self.config.busy_timeout;
        let task = tokio::task::spawn_blocking(move || {
            let conn = open_connection(&path, busy_timeout)?;
            let result = work(&conn, &statement);
            close_connection(conn, &path);
            result
        });
        join(self.config.call_timeout, task).await
    }
}

#[async_trait]
impl Executor for Database {
    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let statement = Statement::expect_read(sql, "query")?;
        self.run(statement, read_rows).await
    }

    async fn query_one(&self, sql: &str) -> Result<Row> {
        let statement = Statement::expect_read(sql, "query_one")?;
        self.run(statement, read_first).await
    }

    async fn execute(&self, sql: &str) -> Result<i64> {
        let statement = Statement::expect_mutation(sql, "execute")?;
        self.run(statement, write).await
    }
}

/// A long-lived connection obtained from [`Database::session`].
///
/// Statements run one at a time. The connection is released by
/// [`Session::close`] or when the session is dropped.
#[derive(Debug)]
pub struct Session {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    call_timeout: Option<Duration>,
}

impl Session {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the connection and report any failure.
    ///
    /// If a timed-out statement is still running, the connection is released
    /// when that statement finishes instead.
    pub fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(conn) => {
                let conn = conn.into_inner().unwrap_or_else(PoisonError::into_inner);
                conn.close().map_err(|(_, source)| DbError::Close(source))?;
                debug!(path = %self.path.display(), "closed database session");
            }
            Err(_) => {
                warn!(
                    path = %self.path.display(),
                    "statement still in flight, connection stays open until it completes"
                );
            }
        }
        Ok(())
    }

    async fn run<T, F>(&self, statement: Statement, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &Statement) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let task = tokio::task::spawn_blocking(move || {
            // A panic mid-statement leaves the connection itself usable.
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            work(&*conn, &statement)
        });
        join(self.call_timeout, task).await
    }
}

#[async_trait]
impl Executor for Session {
    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let statement = Statement::expect_read(sql, "query")?;
        self.run(statement, read_rows).await
    }

    async fn query_one(&self, sql: &str) -> Result<Row> {
        let statement = Statement::expect_read(sql, "query_one")?;
        self.run(statement, read_first).await
    }

    async fn execute(&self, sql: &str) -> Result<i64> {
        let statement = Statement::expect_mutation(sql, "execute")?;
        self.run(statement, write).await
    }
}

/// Create the parent directory if needed, then open `path` read-write.
fn open_connection(path: &Path, busy_timeout: Option<Duration>) -> Result<Connection> {
    if let Some(dir) = parent_dir(path) {
        if !dir.is_dir() {
            std::fs::create_dir_all(dir).map_err(|source| DbError::DataDirectory {
                path: dir.to_path_buf(),
                source,
            })?;
            info!(dir = %dir.display(), "created database directory");
        }
    }

    let connection_error = |source| DbError::Connection {
        path: path.to_path_buf(),
        source,
    };

    let conn = Connection::open_with_flags(path, open_flags()).map_err(connection_error)?;
    if let Some(timeout) = busy_timeout {
        conn.busy_timeout(timeout).map_err(connection_error)?;
    }

    debug!(path = %path.display(), "opened database connection");
    Ok(conn)
}

/// Plain file paths only; `file:` names are not parsed as URIs.
fn open_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

fn close_connection(conn: Connection, path: &Path) {
    match conn.close() {
        Ok(()) => debug!(path = %path.display(), "closed database connection"),
        Err((_, err)) => {
            warn!(path = %path.display(), error = %err, "failed to close database connection")
        }
    }
}

/// Await a blocking task, bounded by `limit` when one is configured.
async fn join<T>(limit: Option<Duration>, task: JoinHandle<Result<T>>) -> Result<T> {
    let Some(limit) = limit else {
        return task.await?;
    };
    match tokio::time::timeout(limit, task).await {
        Ok(joined) => joined?,
        Err(_) => {
            warn!(
                ?limit,
                "database call timed out, statement keeps running in the background"
            );
            Err(DbError::Timeout(limit))
        }
    }
}

fn execution_error(statement: &Statement) -> impl Fn(rusqlite::Error) -> DbError + '_ {
    move |source| DbError::Execution {
        statement: statement.text.clone(),
        source,
    }
}

fn read_rows(conn: &Connection, statement: &Statement) -> Result<Vec<Row>> {
    let failed = execution_error(statement);
    let mut stmt = conn.prepare(&statement.text).map_err(&failed)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let rows = stmt
        .query_map([], |row| Row::from_sqlite(&columns, row))
        .map_err(&failed)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(&failed)?;

    debug!(kind = %statement.kind, rows = rows.len(), "query completed");
    Ok(rows)
}

fn read_first(conn: &Connection, statement: &Statement) -> Result<Row> {
    let failed = execution_error(statement);
    let mut stmt = conn.prepare(&statement.text).map_err(&failed)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([]).map_err(&failed)?;
    let first = match rows.next().map_err(&failed)? {
        Some(row) => Row::from_sqlite(&columns, row).map_err(&failed)?,
        None => {
            return Err(DbError::EmptyResult {
                statement: statement.text.clone(),
            })
        }
    };
    Ok(first)
}

fn write(conn: &Connection, statement: &Statement) -> Result<i64> {
    let failed = execution_error(statement);
    {
        // Step to completion so RETURNING clauses count as success.
        let mut stmt = conn.prepare(&statement.text).map_err(&failed)?;
        let mut rows = stmt.query([]).map_err(&failed)?;
        while rows.next().map_err(&failed)?.is_some() {}
    }

    let result = match statement.kind {
        StatementKind::Insert => conn.last_insert_rowid(),
        _ => i64::try_from(conn.changes()).unwrap_or(i64::MAX),
    };
    debug!(kind = %statement.kind, result, "statement executed");
    Ok(result)
}
