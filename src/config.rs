use std::path::{Path, PathBuf};
use std::time::Duration;

/// Busy timeout applied to every connection unless overridden.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

const DEFAULT_DIR: &str = "data";
const DEFAULT_FILE: &str = "database.sqlite3";

/// Database configuration held by a [`crate::Database`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Explicit database file. `None` means `<cwd>/data/database.sqlite3`.
    pub db_path: Option<PathBuf>,
    /// SQLite busy handler timeout for each opened connection. `None` keeps
    /// the driver default.
    pub busy_timeout: Option<Duration>,
    /// Upper bound on a single async call, measured at the caller.
    pub call_timeout: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout: Some(DEFAULT_BUSY_TIMEOUT),
            call_timeout: None,
        }
    }
}

impl DatabaseConfig {
    /// Create a config pointing at `db_path`. An empty path selects the default location.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self::default().with_path(db_path)
    }

    pub fn with_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.set_path(db_path);
        self
    }

    pub fn set_path(&mut self, db_path: impl Into<PathBuf>) {
        let db_path = db_path.into();
        self.db_path = if db_path.as_os_str().is_empty() {
            None
        } else {
            Some(db_path)
        };
    }

    pub fn with_busy_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// The file every new connection opens.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => path.clone(),
            None => default_path(),
        }
    }
}

/// `<cwd>/data/database.sqlite3`, or the relative form when the working
/// directory cannot be read.
pub(crate) fn default_path() -> PathBuf {
    let base = std::env::current_dir().unwrap_or_default();
    base.join(DEFAULT_DIR).join(DEFAULT_FILE)
}

/// Directory that must exist before `path` can be opened, if any.
pub(crate) fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|dir| !dir.as_os_str().is_empty())
}
