/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::cmp::Ordering;

use super::{BayesScorer, Corpus, TermCounts};

/// A term the scorer selected, with the probability it contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    pub term: String,
    pub prob: f64,
    pub counts: TermCounts,
}

impl BayesScorer {
    /// Spam probability of a single term given its counts and the corpus
    /// totals, clamped to `[min_prob, max_prob]`.
    pub fn term_probability(&self, counts: TermCounts, corpus: Corpus) -> f64 {
        if counts.total() < self.min_token_count {
            return self.default_prob;
        }
        let spamness = f64::min(
            1.0,
            (counts.spam as f64 * self.terms_for_spam as f64) / f64::max(corpus.spam as f64, 1.0),
        );
        let goodness = f64::min(
            1.0,
            (counts.good as f64 * self.terms_for_good as f64) / f64::max(corpus.good as f64, 1.0),
        );
        if spamness + goodness == 0.0 {
            return self.default_prob;
        }
        (spamness / (spamness + goodness)).clamp(self.min_prob, self.max_prob)
    }

    /// Scores one message from its distinct terms and their stored counts.
    ///
    /// Terms absent from the store carry `None` and are ignored. Returns
    /// the combined probability together with the discriminators that
    /// produced it, strongest first.
    ///
    /// The result is bit-identical across platforms for equal inputs: the
    /// candidate order is a total order (deviation, then total count, then
    /// the term string) and log-probabilities are accumulated in that
    /// order.
    pub fn classify<I>(&self, terms: I, corpus: Corpus) -> (f64, Vec<Discriminator>)
    where
        I: IntoIterator<Item = (String, Option<TermCounts>)>,
    {
        let mut candidates = terms
            .into_iter()
            .filter_map(|(term, counts)| {
                let counts = counts?;
                let prob = self.term_probability(counts, corpus);
                ((prob - 0.5).abs() >= self.min_deviation).then_some(Discriminator {
                    term,
                    prob,
                    counts,
                })
            })
            .collect::<Vec<_>>();

        candidates.sort_unstable_by(|a, b| {
            let dev_a = (a.prob - 0.5).abs();
            let dev_b = (b.prob - 0.5).abs();
            dev_b
                .partial_cmp(&dev_a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.counts.total().cmp(&a.counts.total()))
                .then_with(|| a.term.cmp(&b.term))
        });
        candidates.truncate(self.max_discriminators);

        if candidates.is_empty() {
            return (self.default_prob, candidates);
        }

        // Robinson's P / (P + Q), folded in log space so that long products
        // of clamped probabilities cannot underflow to zero.
        let mut ln_p = 0.0f64;
        let mut ln_q = 0.0f64;
        for discriminator in &candidates {
            ln_p += discriminator.prob.ln();
            ln_q += (1.0 - discriminator.prob).ln();
        }
        let score = 1.0 / (1.0 + (ln_q - ln_p).exp());

        (score.clamp(0.0, 1.0), candidates)
    }
}
