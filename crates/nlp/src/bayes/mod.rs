/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod classify;
pub mod train;

use serde::{Deserialize, Serialize};

/// The two training classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Class {
    Good,
    Spam,
}

impl Class {
    pub fn as_str(&self) -> &'static str {
        match self {
            Class::Good => "good",
            Class::Spam => "spam",
        }
    }

    pub fn opposite(&self) -> Class {
        match self {
            Class::Good => Class::Spam,
            Class::Spam => Class::Good,
        }
    }
}

/// How often a term has been seen in each class.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCounts {
    pub good: u32,
    pub spam: u32,
}

impl TermCounts {
    pub fn total(&self) -> u32 {
        self.good + self.spam
    }
}

/// Message totals per class across the whole corpus; the scorer uses
/// only these for frequency normalization.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    pub good: u64,
    pub spam: u64,
}

/// Graham/Robinson scorer parameters.
#[derive(Debug, Clone)]
pub struct BayesScorer {
    /// Terms seen fewer times than this in total score `default_prob`.
    pub min_token_count: u32,
    /// At most this many terms contribute to one score.
    pub max_discriminators: usize,
    /// A term participates only when `|p - 0.5|` reaches this.
    pub min_deviation: f64,
    /// Weight on good counts; > 1 biases toward false negatives.
    pub terms_for_good: u32,
    /// Weight on spam counts.
    pub terms_for_spam: u32,
    pub min_prob: f64,
    pub max_prob: f64,
    /// Probability for unproven terms and for empty selections.
    pub default_prob: f64,
}

impl BayesScorer {
    pub fn new() -> Self {
        BayesScorer {
            min_token_count: 5,
            max_discriminators: 27,
            min_deviation: 0.1,
            terms_for_good: 2,
            terms_for_spam: 1,
            min_prob: 0.0001,
            max_prob: 0.9999,
            default_prob: 0.4,
        }
    }
}

impl Default for BayesScorer {
    fn default() -> Self {
        Self::new()
    }
}
