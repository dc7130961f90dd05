/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::path::PathBuf;

use nlp::tokenizers::Term;
use rusqlite::{Connection, OptionalExtension};

use crate::{into_error, Class, Corpus, Result, StoreError, TermCounts, TermRecord, TermStore};

/// Counters and sizes reported by `info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub terms: u64,
    pub digests: u64,
    pub corpus: Corpus,
    pub file_size: u64,
    pub cache_capacity: usize,
    pub path: PathBuf,
}

impl TermStore {
    pub fn get(&self, term: &str) -> Result<Option<TermRecord>> {
        if let Some(record) = self.cache.get(term) {
            return Ok(Some(record));
        }
        let conn = self.conn()?;
        let record = lookup_term(&conn, term)?;
        if let Some(record) = record {
            self.cache.insert(term.to_string(), record);
        }
        Ok(record)
    }

    /// Batched lookup for one scoring pass.
    ///
    /// The whole pass runs inside a single read transaction: a writer
    /// committing mid-score cannot tear the snapshot. The cache is only
    /// refreshed here, never consulted, because a cached entry can be
    /// newer than the transaction's view. The result is positionally
    /// parallel to `terms`.
    pub fn get_many(&self, terms: &[Term]) -> Result<Vec<Option<TermRecord>>> {
        let mut records = Vec::with_capacity(terms.len());
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction().map_err(into_error)?;
        {
            let mut stmt = tx
                .prepare_cached("SELECT good, spam, last_seen FROM terms WHERE term = ?1")
                .map_err(into_error)?;
            for term in terms {
                let record = stmt
                    .query_row([term.as_str()], row_to_record)
                    .optional()
                    .map_err(into_error)?;
                if let Some(record) = record {
                    self.cache.insert(term.as_str().to_string(), record);
                }
                records.push(record);
            }
        }
        Ok(records)
    }

    pub fn corpus(&self) -> Result<Corpus> {
        let conn = self.conn()?;
        read_corpus(&conn)
    }

    pub fn contains_digest(&self, digest: &[u8; 16]) -> Result<Option<Class>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached("SELECT class FROM digests WHERE digest = ?1")
            .map_err(into_error)?;
        stmt.query_row([digest.as_slice()], |row| row.get::<_, i64>(0))
            .optional()
            .map_err(into_error)?
            .map(class_from_i64)
            .transpose()
    }

    pub fn term_count(&self) -> Result<u64> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM terms", [], |row| row.get(0))
            .map_err(into_error)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let terms = conn
            .query_row("SELECT COUNT(*) FROM terms", [], |row| row.get(0))
            .map_err(into_error)?;
        let digests = conn
            .query_row("SELECT COUNT(*) FROM digests", [], |row| row.get(0))
            .map_err(into_error)?;
        Ok(StoreStats {
            terms,
            digests,
            corpus: read_corpus(&conn)?,
            file_size: self.file_size(),
            cache_capacity: self.cache.capacity(),
            path: self.path.clone(),
        })
    }

    pub(crate) fn file_size(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

pub(crate) fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TermRecord> {
    Ok(TermRecord {
        counts: TermCounts {
            good: row.get(0)?,
            spam: row.get(1)?,
        },
        last_seen: row.get(2)?,
    })
}

pub(crate) fn lookup_term(conn: &Connection, term: &str) -> Result<Option<TermRecord>> {
    conn.prepare_cached("SELECT good, spam, last_seen FROM terms WHERE term = ?1")
        .map_err(into_error)?
        .query_row([term], row_to_record)
        .optional()
        .map_err(into_error)
}

pub(crate) fn read_corpus(conn: &Connection) -> Result<Corpus> {
    Ok(Corpus {
        good: meta_value(conn, "good_messages")?,
        spam: meta_value(conn, "spam_messages")?,
    })
}

pub(crate) fn meta_value(conn: &Connection, key: &str) -> Result<u64> {
    conn.prepare_cached("SELECT value FROM meta WHERE key = ?1")
        .map_err(into_error)?
        .query_row([key], |row| row.get::<_, i64>(0))
        .optional()
        .map_err(into_error)
        .map(|value| value.unwrap_or(0).max(0) as u64)
}

pub(crate) fn class_from_i64(value: i64) -> Result<Class> {
    match value {
        0 => Ok(Class::Good),
        1 => Ok(Class::Spam),
        other => Err(StoreError::Corrupt(format!(
            "digest class column holds {other}"
        ))),
    }
}

pub(crate) fn class_to_i64(class: Class) -> i64 {
    match class {
        Class::Good => 0,
        Class::Spam => 1,
    }
}
