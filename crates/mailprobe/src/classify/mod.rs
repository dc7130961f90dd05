/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod batch;

use std::{
    io::{BufRead, Write},
    path::Path,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use nlp::bayes::{classify::Discriminator, train::collapse_votes, BayesScorer, Class};
use store::{
    dump::ImportReport,
    maintain::MaintenanceReport,
    read::StoreStats,
    write::{DigestOp, TermUpdate},
    TermStore,
};
use tracing::{debug, info};

use crate::{
    config::FilterConfig,
    error::{Error, Result},
    message::Message,
    tokenize::tokenize,
};

/// File name of the term database inside the store directory.
pub const STORE_FILE: &str = "words.db";

/// How long any operation waits on a conflicting writer.
const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// The public face of the engine: scoring, training, retraining,
/// removal and maintenance over one store directory.
pub struct Classifier {
    store: TermStore,
    scorer: BayesScorer,
    config: FilterConfig,
}

/// Outcome of scoring one message.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub score: f64,
    pub is_spam: bool,
    /// The discriminators behind the score, strongest first.
    pub terms: Vec<Discriminator>,
}

impl Classifier {
    /// Opens the classifier over `dir`, creating the store on demand
    /// unless `read_only`.
    pub fn open(dir: &Path, config: FilterConfig, read_only: bool) -> Result<Classifier> {
        config.validate()?;
        let store = TermStore::open(
            dir.join(STORE_FILE),
            read_only,
            config.cache_size,
            LOCK_TIMEOUT,
        )?;
        Ok(Classifier {
            scorer: config.scorer(),
            store,
            config,
        })
    }

    /// Days since the Unix epoch; the granularity of `last_seen`.
    pub fn today() -> u32 {
        (SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            / 86_400) as u32
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn store(&self) -> &TermStore {
        &self.store
    }

    /// Scores a message. Read-only; never touches training state.
    pub fn classify(&self, message: &Message) -> Result<Verdict> {
        let terms = collapse_votes(tokenize(message, &self.config));
        let records = self.store.get_many(&terms)?;
        let corpus = self.store.corpus()?;
        let (score, used) = self.scorer.classify(
            terms
                .into_iter()
                .zip(records)
                .map(|(term, record)| (term.into_string(), record.map(|r| r.counts))),
            corpus,
        );
        debug!(score, discriminators = used.len(), "scored message");
        Ok(Verdict {
            score,
            is_spam: score >= self.config.spam_threshold,
            terms: used,
        })
    }

    pub fn classify_bytes(&self, raw: &[u8]) -> Result<Verdict> {
        self.classify(&Message::parse(raw)?)
    }

    /// Trains one message as `class`. Returns whether the store changed:
    /// retraining the same class is a no-op, the opposite class is a
    /// reclassification carried out in a single commit.
    pub fn train(&self, message: &Message, class: Class) -> Result<bool> {
        match self.store.contains_digest(&message.digest)? {
            Some(existing) if existing == class => Ok(false),
            existing => {
                let terms = collapse_votes(tokenize(message, &self.config));
                let mut updates = Vec::with_capacity(2);
                if let Some(old) = existing {
                    updates.push(TermUpdate {
                        terms: &terms,
                        class: old,
                        delta: -1,
                    });
                }
                updates.push(TermUpdate {
                    terms: &terms,
                    class,
                    delta: 1,
                });
                self.store.apply(
                    &updates,
                    Some((&message.digest, DigestOp::Insert(class))),
                    Self::today(),
                )?;
                info!(
                    class = class.as_str(),
                    reclassified = existing.is_some(),
                    terms = terms.len(),
                    "trained message"
                );
                Ok(true)
            }
        }
    }

    pub fn train_bytes(&self, raw: &[u8], class: Class) -> Result<bool> {
        self.train(&Message::parse(raw)?, class)
    }

    /// Train-on-error: scores first and trains only when the current
    /// prediction disagrees with `actual`.
    pub fn train_if_misclassified(&self, message: &Message, actual: Class) -> Result<bool> {
        let verdict = self.classify(message)?;
        let predicted = if verdict.is_spam {
            Class::Spam
        } else {
            Class::Good
        };
        if predicted == actual {
            Ok(false)
        } else {
            self.train(message, actual)
        }
    }

    /// Reverses a previous `train`. Fails with `UnknownMessage` when the
    /// digest was never recorded.
    pub fn remove(&self, message: &Message) -> Result<()> {
        match self.store.contains_digest(&message.digest)? {
            None => Err(Error::UnknownMessage(message.digest_hex())),
            Some(class) => {
                let terms = collapse_votes(tokenize(message, &self.config));
                self.store.apply(
                    &[TermUpdate {
                        terms: &terms,
                        class,
                        delta: -1,
                    }],
                    Some((&message.digest, DigestOp::Remove)),
                    Self::today(),
                )?;
                info!(class = class.as_str(), "removed message");
                Ok(())
            }
        }
    }

    /// Expires stale single-sighting terms and compacts the store.
    pub fn maintain(&self, now_days: u32) -> Result<MaintenanceReport> {
        Ok(self.store.maintenance(now_days, self.config.expiry_days)?)
    }

    /// Drops every term below the scorer's proof threshold.
    pub fn purge(&self) -> Result<u64> {
        Ok(self.store.purge(self.config.min_token_count)?)
    }

    pub fn export<W: Write>(&self, out: &mut W) -> Result<()> {
        Ok(self.store.export(out)?)
    }

    pub fn import<R: BufRead>(&self, input: R) -> Result<ImportReport> {
        Ok(self.store.import(input)?)
    }

    pub fn backup(&self, dst: &Path) -> Result<u64> {
        Ok(self.store.backup(dst)?)
    }

    /// Replaces the store file from a backup. The store must not be open
    /// anywhere, so this is an associated function.
    pub fn restore(backup: &Path, dir: &Path) -> Result<u64> {
        Ok(TermStore::restore(backup, &dir.join(STORE_FILE))?)
    }

    pub fn info(&self) -> Result<StoreStats> {
        Ok(self.store.stats()?)
    }
}
