use crate::error::Error;
use rusqlite::{Connection, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

const SCHEMA_VERSION: i64 = 1;

/// Handle to the directory stats cache. Created once at startup and shared by
/// reference; each write locks the connection for one transaction.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Opens the cache, deleting and recreating it when the file is corrupt
    /// or unreadable. Cached stats are lost; the next scan rebuilds them.
    pub fn open_or_recreate(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(db) => Ok(db),
            Err(err) => {
                warn!(
                    "Cache {} is unusable ({}), recreating it",
                    path.display(),
                    err
                );
                clean(path)?;
                Ok(Self::open(path)?)
            }
        }
    }

    fn init(conn: Connection) -> Result<Self> {
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        db.check_integrity()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.connection().execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, foreign keys)");
        Ok(())
    }

    /// Older schemas are dropped and recreated; everything here is
    /// recomputable from the filesystem.
    fn migrate_schema(&self) -> Result<()> {
        let conn = self.connection();
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version != SCHEMA_VERSION {
            debug!(
                "Schema version {} != {}, dropping all tables and recreating",
                version, SCHEMA_VERSION
            );
            conn.execute_batch(
                "DROP TABLE IF EXISTS stat;
                 DROP TABLE IF EXISTS directory;",
            )?;
        }

        conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema initialized (version {})", SCHEMA_VERSION);
        Ok(())
    }

    fn check_integrity(&self) -> Result<()> {
        let result: String = self
            .connection()
            .query_row("PRAGMA quick_check", [], |row| row.get(0))?;
        if result != "ok" {
            return Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CORRUPT),
                Some(result),
            ));
        }
        Ok(())
    }

    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Deletes the cache file and its WAL companions. A missing file is fine.
pub fn clean(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    for file in cache_files(path) {
        match fs::remove_file(&file) {
            Ok(()) => info!("Removed {}", file.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn cache_files(path: &Path) -> Vec<PathBuf> {
    let mut files = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        files.push(PathBuf::from(name));
    }
    files
}
