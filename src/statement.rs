use std::fmt;

use crate::error::{DbError, Result};

/// Routing category taken from a statement's leading keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    /// Anything else, holding the lower-cased keyword.
    Other(String),
}

impl StatementKind {
    /// Lower-cased first token after splitting on a single space.
    ///
    /// This is a routing heuristic, not a parser: `"  SELECT 1"` yields an
    /// empty keyword and `"SELECT\n*"` yields `"select\n*"`.
    pub fn classify(sql: &str) -> Self {
        let keyword = sql.split(' ').next().unwrap_or_default().to_lowercase();
        match keyword.as_str() {
            "select" => StatementKind::Select,
            "insert" => StatementKind::Insert,
            "update" => StatementKind::Update,
            "delete" => StatementKind::Delete,
            "create" => StatementKind::Create,
            _ => StatementKind::Other(keyword),
        }
    }

    pub fn keyword(&self) -> &str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Create => "create",
            StatementKind::Other(keyword) => keyword,
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, StatementKind::Select)
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            StatementKind::Insert
                | StatementKind::Update
                | StatementKind::Delete
                | StatementKind::Create
        )
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Raw SQL text plus its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    pub kind: StatementKind,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = StatementKind::classify(&text);
        Self { text, kind }
    }

    /// Accept only `SELECT` statements, for `operation`.
    pub(crate) fn expect_read(text: &str, operation: &'static str) -> Result<Self> {
        let statement = Self::new(text);
        if statement.kind.is_read() {
            Ok(statement)
        } else {
            Err(statement.usage_error(operation, "a SELECT"))
        }
    }

    /// Accept only `INSERT`/`UPDATE`/`DELETE`/`CREATE` statements, for `operation`.
    pub(crate) fn expect_mutation(text: &str, operation: &'static str) -> Result<Self> {
        let statement = Self::new(text);
        if statement.kind.is_mutation() {
            Ok(statement)
        } else {
            Err(statement.usage_error(operation, "an INSERT, UPDATE, DELETE or CREATE"))
        }
    }

    fn usage_error(&self, operation: &'static str, expected: &'static str) -> DbError {
        DbError::Usage {
            operation,
            expected,
            keyword: self.kind.keyword().to_string(),
        }
    }
}
