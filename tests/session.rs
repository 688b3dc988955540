use std::time::Duration;

use rust_sqlite_access::{Database, DatabaseConfig, ErrorKind, Executor, Value};

#[tokio::test]
async fn test_session_keeps_one_connection() -> anyhow::Result<()> {
    let db = Database::open(":memory:");
    let session = db.session().await?;

    // An in-memory database only survives on a single connection.
    session
        .execute("CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)")
        .await?;
    assert_eq!(session.execute("INSERT INTO t(v) VALUES('a')").await?, 1);
    assert_eq!(session.execute("INSERT INTO t(v) VALUES('b')").await?, 2);

    let rows = session.query("SELECT v FROM t ORDER BY id").await?;
    let values: Vec<&str> = rows
        .iter()
        .filter_map(|row| row.get("v").and_then(Value::as_str))
        .collect();
    assert_eq!(values, ["a", "b"]);

    session.close()?;
    Ok(())
}

#[tokio::test]
async fn test_session_shares_file_with_per_call_access() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("shared.sqlite3");
    let db = Database::open(&path);

    let session = db.session().await?;
    assert_eq!(session.path(), path.as_path());
    assert!(path.parent().is_some_and(|p| p.is_dir()));

    session
        .execute("CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)")
        .await?;
    session.execute("INSERT INTO t(v) VALUES('from session')").await?;

    let row = db.query_one("SELECT v FROM t").await?;
    assert_eq!(row.get("v").and_then(Value::as_str), Some("from session"));

    drop(session);
    assert_eq!(db.execute("DELETE FROM t").await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_session_applies_the_same_rules() -> anyhow::Result<()> {
    let db = Database::open(":memory:");
    let session = db.session().await?;
    session.execute("CREATE TABLE t(id INTEGER PRIMARY KEY)").await?;

    assert!(session.query("DELETE FROM t").await.unwrap_err().is_usage());
    assert!(session.execute("SELECT * FROM t").await.unwrap_err().is_usage());
    assert!(session
        .query_one("SELECT * FROM t")
        .await
        .unwrap_err()
        .is_empty_result());
    assert!(session
        .execute("INSERT INTO nope VALUES(1)")
        .await
        .unwrap_err()
        .is_execution());

    // Still usable after errors.
    assert_eq!(session.execute("INSERT INTO t DEFAULT VALUES").await?, 1);
    session.close()?;
    Ok(())
}

#[tokio::test]
async fn test_session_open_failure_is_a_connection_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"x")?;

    let db = Database::open(blocker.join("db.sqlite3"));
    let err = db.session().await.unwrap_err();
    assert!(err.is_connection(), "unexpected error: {err}");
    Ok(())
}

#[tokio::test]
async fn test_generous_call_timeout_does_not_interfere() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = DatabaseConfig::new(dir.path().join("db.sqlite3"))
        .with_call_timeout(Some(Duration::from_secs(30)))
        .with_busy_timeout(Some(Duration::from_millis(500)));
    let db = Database::new(config);

    db.execute("CREATE TABLE t(id INTEGER PRIMARY KEY)").await?;
    assert_eq!(db.execute("INSERT INTO t DEFAULT VALUES").await?, 1);
    assert_eq!(db.query("SELECT * FROM t").await?.len(), 1);

    let session = db.session().await?;
    assert_eq!(session.query_one("SELECT count(*) AS n FROM t").await?.get("n"), Some(&Value::Integer(1)));
    session.close()?;
    Ok(())
}

// Sums three million generated rows, long enough to outlast a 1 ms limit.
const SLOW_SELECT: &str = "SELECT sum(x) AS s FROM (WITH RECURSIVE c(x) AS \
    (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 3000000) SELECT x FROM c)";

#[tokio::test]
async fn test_call_timeout_expires() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = DatabaseConfig::new(dir.path().join("db.sqlite3"))
        .with_call_timeout(Some(Duration::from_millis(1)));
    let db = Database::new(config);

    let err = db.query(SLOW_SELECT).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(err.to_string(), "database call timed out after 1ms");
    Ok(())
}

#[tokio::test]
async fn test_close_while_statement_in_flight_defers_release() -> anyhow::Result<()> {
    let session = Database::open(":memory:").session().await?;

    // Abandon the call early; its blocking statement keeps the connection.
    let abandoned =
        tokio::time::timeout(Duration::from_millis(1), session.query_one(SLOW_SELECT)).await;
    assert!(abandoned.is_err(), "statement should still be running");

    // Close reports no failure and leaves the release to the running statement.
    session.close()?;
    Ok(())
}
