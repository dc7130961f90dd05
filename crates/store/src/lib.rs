/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Persistent term-frequency store.
//!
//! One SQLite database holds the term records, the digest set and the
//! corpus counters. Writers serialize on SQLite's exclusive lock; readers
//! share snapshots. All mutation goes through a single transaction per
//! logical operation, so a crash rolls back to the last committed state.

pub mod cache;
pub mod dump;
pub mod maintain;
pub mod read;
pub mod write;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;

use crate::cache::TermCache;

pub use nlp::bayes::{Class, Corpus, TermCounts};

pub const SCHEMA_VERSION: u32 = 1;

/// Number of pooled connections; scoring fan-out shares these.
const POOL_SIZE: u32 = 8;

/// One row of the term table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TermRecord {
    pub counts: TermCounts,
    /// Days since the Unix epoch the term was last touched.
    pub last_seen: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot open store at {path}: {reason}")]
    Unavailable { path: PathBuf, reason: String },
    #[error("store corrupt: {0}")]
    Corrupt(String),
    #[error("store locked by another process")]
    Busy,
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Maps SQLite failures onto the store taxonomy. Lock contention and
/// on-disk corruption are the two cases callers can act on.
pub(crate) fn into_error(err: rusqlite::Error) -> StoreError {
    use rusqlite::ErrorCode;

    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if matches!(
            failure.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
        ) {
            return StoreError::Busy;
        }
    }
    StoreError::Corrupt(err.to_string())
}

#[derive(Clone)]
pub struct TermStore {
    pub(crate) pool: Pool<SqliteConnectionManager>,
    pub(crate) cache: TermCache,
    pub(crate) path: PathBuf,
    pub(crate) read_only: bool,
}

impl TermStore {
    /// Opens (creating on demand unless `read_only`) the store at `path`.
    ///
    /// `busy_timeout` bounds how long any operation waits for a
    /// conflicting writer before failing with [`StoreError::Busy`].
    pub fn open(
        path: impl AsRef<Path>,
        read_only: bool,
        cache_size: usize,
        busy_timeout: Duration,
    ) -> Result<TermStore> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |reason: String| StoreError::Unavailable {
            path: path.clone(),
            reason,
        };

        if read_only && !path.exists() {
            return Err(unavailable("database file does not exist".into()));
        }
        if let Some(parent) = path.parent() {
            if !read_only && !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let flags = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };
        let timeout_ms = busy_timeout.as_millis().min(i32::MAX as u128) as i32;
        let manager = SqliteConnectionManager::file(&path)
            .with_flags(flags)
            .with_init(move |c| {
                // journal_mode is persistent and cannot be set through a
                // read-only connection
                if !read_only {
                    c.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
                }
                c.execute_batch(&format!(
                    "PRAGMA temp_store = memory; PRAGMA busy_timeout = {timeout_ms};"
                ))
            });

        let pool = Pool::builder()
            .max_size(POOL_SIZE)
            .connection_timeout(busy_timeout.max(Duration::from_secs(1)))
            .build(manager)
            .map_err(|err| unavailable(err.to_string()))?;
        let store = TermStore {
            pool,
            cache: TermCache::with_capacity(cache_size),
            path,
            read_only,
        };

        if !read_only {
            store.create_tables()?;
            store.check_integrity()?;
        }
        tracing::debug!(path = %store.path.display(), read_only, "opened term store");

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS terms (
                term TEXT PRIMARY KEY,
                good INTEGER NOT NULL DEFAULT 0,
                spam INTEGER NOT NULL DEFAULT 0,
                last_seen INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )
        .map_err(into_error)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS digests (
                digest BLOB PRIMARY KEY,
                class INTEGER NOT NULL
            )",
            [],
        )
        .map_err(into_error)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )
        .map_err(into_error)?;
        conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?1)",
            [SCHEMA_VERSION],
        )
        .map_err(into_error)?;

        let version: u32 = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .map_err(into_error)?;
        if version > SCHEMA_VERSION {
            return Err(StoreError::Corrupt(format!(
                "schema version {version} is newer than supported {SCHEMA_VERSION}"
            )));
        }

        Ok(())
    }

    fn check_integrity(&self) -> Result<()> {
        let conn = self.conn()?;
        let verdict: String = conn
            .query_row("PRAGMA quick_check", [], |row| row.get(0))
            .map_err(into_error)?;
        if verdict == "ok" {
            Ok(())
        } else {
            Err(StoreError::Corrupt(verdict))
        }
    }

    pub(crate) fn conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        // a pool timeout means every connection is tied up behind a writer
        self.pool.get().map_err(|_| StoreError::Busy)
    }
}
