/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use rusqlite::TransactionBehavior;
use tracing::debug;

use crate::{into_error, Result, TermStore};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub terms_removed: u64,
    pub bytes_reclaimed: u64,
}

impl TermStore {
    /// Expires low-signal records: anything whose total count is at most
    /// one and whose `last_seen` is `expiry_days` or more in the past, plus
    /// records decremented all the way to zero. Compacts afterwards.
    ///
    /// Deletion commits in one transaction at the end, never piecemeal.
    /// Corpus counters are untouched; they track messages, not terms.
    pub fn maintenance(&self, now_days: u32, expiry_days: u32) -> Result<MaintenanceReport> {
        self.writable()?;
        let size_before = self.file_size();
        let cutoff = now_days.saturating_sub(expiry_days);

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(into_error)?;
        let terms_removed = tx
            .execute(
                concat!(
                    "DELETE FROM terms WHERE ",
                    "(good + spam <= 1 AND last_seen <= ?1) ",
                    "OR (good = 0 AND spam = 0)"
                ),
                [cutoff],
            )
            .map_err(into_error)? as u64;
        tx.commit().map_err(into_error)?;

        self.compact()?;
        self.cache.clear();

        let report = MaintenanceReport {
            terms_removed,
            bytes_reclaimed: size_before.saturating_sub(self.file_size()),
        };
        debug!(
            terms_removed = report.terms_removed,
            bytes_reclaimed = report.bytes_reclaimed,
            "maintenance pass complete"
        );
        Ok(report)
    }

    /// Drops every record below the scorer's proof threshold, regardless
    /// of age.
    pub fn purge(&self, min_count: u32) -> Result<u64> {
        self.writable()?;
        let conn = self.conn()?;
        let removed = conn
            .execute("DELETE FROM terms WHERE good + spam < ?1", [min_count])
            .map_err(into_error)? as u64;
        self.compact()?;
        self.cache.clear();
        Ok(removed)
    }

    fn compact(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch("VACUUM; PRAGMA wal_checkpoint(TRUNCATE);")
            .map_err(into_error)
    }
}
