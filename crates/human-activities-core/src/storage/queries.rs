use super::models::*;
use super::sqlite::Database;
use crate::scanner::DirSize;
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::collections::HashSet;
use tracing::debug;

impl Database {
    // ── Directories ──────────────────────────────────────────────

    /// Makes the stored directory set match `paths` exactly: missing paths
    /// are inserted, stored paths no longer requested are deleted together
    /// with their stats, and the rest are loaded untouched.
    pub fn reconcile(&self, paths: &[String]) -> Result<DirectorySet> {
        let wanted: HashSet<&str> = paths.iter().map(String::as_str).collect();

        let mut conn = self.connection();
        let tx = conn.transaction()?;
        {
            let stored: Vec<(i64, String)> = tx
                .prepare("SELECT id, path FROM directory")?
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>>>()?;

            let mut delete = tx.prepare_cached("DELETE FROM directory WHERE id = ?1")?;
            for (id, path) in stored.iter().filter(|(_, p)| !wanted.contains(p.as_str())) {
                delete.execute(params![id])?;
                debug!("Removed directory {} from cache", path);
            }

            let mut insert =
                tx.prepare_cached("INSERT OR IGNORE INTO directory (path) VALUES (?1)")?;
            for path in paths {
                if insert.execute(params![path])? > 0 {
                    debug!("Added directory {} to cache", path);
                }
            }
        }
        tx.commit()?;

        let mut seen = HashSet::new();
        let mut directories = Vec::with_capacity(paths.len());
        for path in paths.iter().filter(|p| seen.insert(p.as_str())) {
            if let Some(directory) = load_directory(&conn, path)? {
                directories.push(directory);
            }
        }
        Ok(DirectorySet::new(directories))
    }

    /// Replaces every stat of `directory` with a fresh all-files stat and,
    /// for a non-zero threshold, a new-files stat. Runs as one transaction.
    pub fn update_stats(
        &self,
        directory: &Directory,
        threshold_days_ago: u32,
        size: &DirSize,
    ) -> Result<Directory> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut conn = self.connection();
        let tx = conn.transaction()?;
        {
            tx.execute(
                "DELETE FROM stat WHERE directory_id = ?1",
                params![directory.id],
            )?;

            let mut insert = tx.prepare_cached(
                "INSERT INTO stat (directory_id, size_bytes, num_files, threshold_days_ago) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            insert.execute(params![
                directory.id,
                to_i64(size.size_bytes_all),
                to_i64(size.num_files_all),
                0_i64,
            ])?;
            if threshold_days_ago != 0 {
                insert.execute(params![
                    directory.id,
                    to_i64(size.size_bytes_new),
                    to_i64(size.num_files_new),
                    i64::from(threshold_days_ago),
                ])?;
            }

            tx.execute(
                "UPDATE directory SET scanned_at = ?1 WHERE id = ?2",
                params![now, directory.id],
            )?;
        }
        tx.commit()?;

        load_directory(&conn, &directory.path)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    pub fn directory(&self, path: &str) -> Result<Option<Directory>> {
        load_directory(&self.connection(), path)
    }

    /// Every cached directory, ordered by path.
    pub fn list_directories(&self) -> Result<Vec<Directory>> {
        let conn = self.connection();
        let paths: Vec<String> = conn
            .prepare("SELECT path FROM directory ORDER BY path")?
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>>>()?;

        let mut directories = Vec::with_capacity(paths.len());
        for path in &paths {
            if let Some(directory) = load_directory(&conn, path)? {
                directories.push(directory);
            }
        }
        Ok(directories)
    }
}

fn load_directory(conn: &Connection, path: &str) -> Result<Option<Directory>> {
    let row = conn
        .query_row(
            "SELECT id, path, scanned_at FROM directory WHERE path = ?1",
            params![path],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get(2)?)),
        )
        .optional()?;

    let Some((id, path, scanned_at)) = row else {
        return Ok(None);
    };

    let stats = conn
        .prepare_cached(
            "SELECT size_bytes, num_files, threshold_days_ago FROM stat \
             WHERE directory_id = ?1 ORDER BY threshold_days_ago",
        )?
        .query_map(params![id], |row| {
            Ok(Stat {
                size_bytes: row.get(0)?,
                num_files: row.get(1)?,
                threshold_days_ago: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(Directory {
        id,
        path,
        scanned_at,
        stats,
    }))
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
