/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use nlp::tokenizers::Term;
use rusqlite::{params, TransactionBehavior};

use crate::{
    into_error,
    read::{class_to_i64, row_to_record},
    Class, Result, StoreError, TermRecord, TermStore,
};

/// Digest-set mutation that rides in the same transaction as the term
/// updates it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestOp {
    Insert(Class),
    Remove,
}

/// One signed class vote over a set of distinct terms.
#[derive(Debug)]
pub struct TermUpdate<'x> {
    pub terms: &'x [Term],
    pub class: Class,
    /// +1 trains, -1 untrains. Counts clamp at zero.
    pub delta: i32,
}

impl TermStore {
    /// Applies term updates, the matching corpus-counter changes and an
    /// optional digest mutation as one atomic commit.
    ///
    /// A reclassification passes two updates (the decrement of the old
    /// class and the increment of the new) so no observer can see the
    /// halfway state. Cache entries are refreshed only after the commit
    /// succeeds.
    pub fn apply(
        &self,
        updates: &[TermUpdate<'_>],
        digest: Option<(&[u8; 16], DigestOp)>,
        now_days: u32,
    ) -> Result<()> {
        self.writable()?;
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(into_error)?;

        let mut touched: Vec<(String, TermRecord)> = Vec::new();
        {
            let mut upsert = tx
                .prepare_cached(concat!(
                    "INSERT INTO terms (term, good, spam, last_seen) ",
                    "VALUES (?1, MAX(0, ?2), MAX(0, ?3), ?4) ",
                    "ON CONFLICT(term) DO UPDATE SET ",
                    "good = MAX(0, good + ?2), ",
                    "spam = MAX(0, spam + ?3), ",
                    "last_seen = ?4 ",
                    "RETURNING good, spam, last_seen"
                ))
                .map_err(into_error)?;
            let mut counter = tx
                .prepare_cached(concat!(
                    "INSERT INTO meta (key, value) VALUES (?1, MAX(0, ?2)) ",
                    "ON CONFLICT(key) DO UPDATE SET value = MAX(0, value + ?2)"
                ))
                .map_err(into_error)?;

            for update in updates {
                let (good_delta, spam_delta) = match update.class {
                    Class::Good => (update.delta, 0),
                    Class::Spam => (0, update.delta),
                };
                for term in update.terms {
                    let record = upsert
                        .query_row(
                            params![term.as_str(), good_delta, spam_delta, now_days],
                            row_to_record,
                        )
                        .map_err(into_error)?;
                    touched.push((term.as_str().to_string(), record));
                }
                let counter_key = match update.class {
                    Class::Good => "good_messages",
                    Class::Spam => "spam_messages",
                };
                counter
                    .execute(params![counter_key, update.delta])
                    .map_err(into_error)?;
            }

            if let Some((digest, op)) = digest {
                match op {
                    DigestOp::Insert(class) => {
                        tx.prepare_cached(concat!(
                            "INSERT INTO digests (digest, class) VALUES (?1, ?2) ",
                            "ON CONFLICT(digest) DO UPDATE SET class = excluded.class"
                        ))
                        .map_err(into_error)?
                        .execute(params![digest.as_slice(), class_to_i64(class)])
                        .map_err(into_error)?;
                    }
                    DigestOp::Remove => {
                        tx.prepare_cached("DELETE FROM digests WHERE digest = ?1")
                            .map_err(into_error)?
                            .execute([digest.as_slice()])
                            .map_err(into_error)?;
                    }
                }
            }
        }
        tx.commit().map_err(into_error)?;

        for (term, record) in touched {
            self.cache.insert(term, record);
        }
        Ok(())
    }

    pub(crate) fn writable(&self) -> Result<()> {
        if self.read_only {
            Err(StoreError::Unavailable {
                path: self.path.clone(),
                reason: "store was opened read-only".into(),
            })
        } else {
            Ok(())
        }
    }
}
