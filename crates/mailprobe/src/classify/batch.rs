/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::sync::atomic::{AtomicBool, Ordering};

use nlp::bayes::Class;
use tracing::{info, warn};

use super::{Classifier, Verdict};
use crate::{
    error::{Error, Result},
    message::Message,
};

/// What happened across one batch of messages. Malformed inputs are
/// counted, not fatal; store-level failures abort the batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: u64,
    pub trained: u64,
    pub errors: u64,
}

impl Classifier {
    /// Trains every message in the batch as `class`, committing one
    /// message at a time. Cancellation is honored between messages;
    /// work already committed stays committed.
    pub fn train_all<I>(&self, messages: I, class: Class, cancel: &AtomicBool) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        self.train_batch(messages, cancel, |message| self.train(message, class))
    }

    /// Train-on-error over a batch: each message is scored and trained
    /// only when the prediction disagrees with `actual`.
    pub fn train_all_on_error<I>(
        &self,
        messages: I,
        actual: Class,
        cancel: &AtomicBool,
    ) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        self.train_batch(messages, cancel, |message| {
            self.train_if_misclassified(message, actual)
        })
    }

    fn train_batch<I, F>(&self, messages: I, cancel: &AtomicBool, mut train: F) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = Vec<u8>>,
        F: FnMut(&Message) -> Result<bool>,
    {
        let mut summary = BatchSummary::default();
        for raw in messages {
            if cancel.load(Ordering::Relaxed) {
                info!(
                    processed = summary.processed,
                    "training cancelled; committed prefix kept"
                );
                break;
            }
            summary.processed += 1;
            let message = match Message::parse(&raw) {
                Ok(message) => message,
                Err(Error::MalformedMessage(reason)) => {
                    warn!(%reason, "skipping malformed message");
                    summary.errors += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };
            if train(&message)? {
                summary.trained += 1;
            }
        }
        Ok(summary)
    }

    /// Scores a batch in parallel on a small scoped thread pool. Results
    /// come back in input order; every worker reads its own consistent
    /// store snapshot.
    pub fn classify_all(&self, messages: &[Vec<u8>], workers: usize) -> Vec<Result<Verdict>> {
        let workers = workers.clamp(1, 8).min(messages.len().max(1));
        if workers <= 1 {
            return messages.iter().map(|raw| self.classify_bytes(raw)).collect();
        }

        let mut slots: Vec<Option<Result<Verdict>>> = Vec::with_capacity(messages.len());
        slots.resize_with(messages.len(), || None);
        let chunk = messages.len().div_ceil(workers);

        std::thread::scope(|scope| {
            for (slots, raws) in slots.chunks_mut(chunk).zip(messages.chunks(chunk)) {
                scope.spawn(move || {
                    for (slot, raw) in slots.iter_mut().zip(raws) {
                        *slot = Some(self.classify_bytes(raw));
                    }
                });
            }
        });

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(Error::MalformedMessage("worker never ran".into())))
            })
            .collect()
    }
}
