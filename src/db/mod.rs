//! SQLite-backed knowledge store for places and their links.
//!
//! The default location (`~/.placelink/places.db`) comes from
//! `config::db_path`. Both collections ("lodging", "meetingPoint") and the
//! link table share one file; all
//! operations are collection-scoped. Read-modify-write merges run inside
//! `BEGIN IMMEDIATE` transactions so two writers can never interleave a
//! keyword merge.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};

pub mod legacy;
pub mod links;
pub mod places;
pub mod types;
pub use types::*;

pub struct PlaceDb {
    conn: Connection,
}

impl PlaceDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within a SQLite transaction.
    /// Commits on Ok, rolls back on Err.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Self) -> Result<T, DbError>,
    {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(val) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(val)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Open (or create) a store at `path` and apply the schema.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        // Concurrent writers wait for the IMMEDIATE lock instead of failing.
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        crate::migrations::run_migrations(&conn).map_err(DbError::Migration)?;

        Ok(Self { conn })
    }

    /// Open an existing database read-only. No schema is applied.
    pub fn open_readonly_at(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }
}

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
