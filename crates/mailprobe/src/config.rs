/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::{path::Path, str::FromStr};

use nlp::bayes::BayesScorer;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Every tunable the engine recognizes. Unknown keys, whether from a
/// config file or a command-line override, are a hard error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Terms seen fewer times than this in total are unproven and score
    /// `default_prob`.
    pub min_token_count: u32,
    /// Maximum terms selected per message for scoring.
    pub max_discriminators: usize,
    /// A term participates only if `|p - 0.5|` reaches this.
    pub min_deviation: f64,
    /// Messages scoring at or above this are labeled spam.
    pub spam_threshold: f64,
    /// Weight multiplier on good counts (bias against false positives).
    pub terms_for_good: u32,
    /// Weight multiplier on spam counts.
    pub terms_for_spam: u32,
    pub min_prob: f64,
    pub max_prob: f64,
    /// Probability for unproven terms and empty selections.
    pub default_prob: f64,
    /// Consecutive body tokens joined into phrase terms.
    pub phrase_length: usize,
    /// Collapse runs of non-ASCII input to a sentinel token.
    pub replace_non_ascii: bool,
    /// Emit header-derived terms only.
    pub ignore_body: bool,
    /// In-memory LRU capacity of the term store.
    pub cache_size: usize,
    /// Age bound used by maintenance when expiring single-sighting terms.
    pub expiry_days: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            min_token_count: 5,
            max_discriminators: 27,
            min_deviation: 0.1,
            spam_threshold: 0.9,
            terms_for_good: 2,
            terms_for_spam: 1,
            min_prob: 0.0001,
            max_prob: 0.9999,
            default_prob: 0.4,
            phrase_length: 2,
            replace_non_ascii: true,
            ignore_body: false,
            cache_size: 2500,
            expiry_days: 7,
        }
    }
}

/// Named starting points; every preset can still be overridden key by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Paul Graham's published numbers; the defaults.
    Graham,
    /// Harder to call spam, stronger good-count bias.
    Conservative,
    /// Lower threshold, no good-count bias.
    Aggressive,
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(name: &str) -> Result<Preset> {
        match name {
            "graham" => Ok(Preset::Graham),
            "conservative" => Ok(Preset::Conservative),
            "aggressive" => Ok(Preset::Aggressive),
            _ => Err(Error::ConfigInvalid(format!("unknown preset '{name}'"))),
        }
    }
}

impl FilterConfig {
    pub fn preset(preset: Preset) -> FilterConfig {
        let mut config = FilterConfig::default();
        match preset {
            Preset::Graham => {}
            Preset::Conservative => {
                config.spam_threshold = 0.95;
                config.terms_for_good = 5;
            }
            Preset::Aggressive => {
                config.spam_threshold = 0.7;
                config.terms_for_good = 1;
            }
        }
        config
    }

    /// Reads a TOML config file holding any subset of the keys and
    /// applies them over `self`, so a file can refine a preset without
    /// resetting the options it leaves out.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&text)
            .map_err(|err| Error::ConfigInvalid(format!("{}: {err}", path.display())))?;
        for (key, value) in &table {
            let value = match value {
                toml::Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            self.set(key, &value).map_err(|err| match err {
                Error::ConfigInvalid(reason) => {
                    Error::ConfigInvalid(format!("{}: {reason}", path.display()))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    /// Reads a TOML config file on top of the defaults.
    pub fn load(path: &Path) -> Result<FilterConfig> {
        let mut config = FilterConfig::default();
        config.merge_file(path)?;
        Ok(config)
    }

    /// Applies one `key=value` override with the same validation the file
    /// loader uses.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
            value.parse().map_err(|_| {
                Error::ConfigInvalid(format!("bad value '{value}' for option '{key}'"))
            })
        }

        match key {
            "min_token_count" => self.min_token_count = parse(key, value)?,
            "max_discriminators" => self.max_discriminators = parse(key, value)?,
            "min_deviation" => self.min_deviation = parse(key, value)?,
            "spam_threshold" => self.spam_threshold = parse(key, value)?,
            "terms_for_good" => self.terms_for_good = parse(key, value)?,
            "terms_for_spam" => self.terms_for_spam = parse(key, value)?,
            "min_prob" => self.min_prob = parse(key, value)?,
            "max_prob" => self.max_prob = parse(key, value)?,
            "default_prob" => self.default_prob = parse(key, value)?,
            "phrase_length" => self.phrase_length = parse(key, value)?,
            "replace_non_ascii" => self.replace_non_ascii = parse(key, value)?,
            "ignore_body" => self.ignore_body = parse(key, value)?,
            "cache_size" => self.cache_size = parse(key, value)?,
            "expiry_days" => self.expiry_days = parse(key, value)?,
            _ => {
                return Err(Error::ConfigInvalid(format!("unknown option '{key}'")));
            }
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |what: &str| Err(Error::ConfigInvalid(what.to_string()));

        if !(0.0..=1.0).contains(&self.min_prob) || !(0.0..=1.0).contains(&self.max_prob) {
            return fail("min_prob and max_prob must lie in [0, 1]");
        }
        if self.min_prob >= self.max_prob {
            return fail("min_prob must be below max_prob");
        }
        if !(0.0..=1.0).contains(&self.default_prob) {
            return fail("default_prob must lie in [0, 1]");
        }
        if !(0.0..=0.5).contains(&self.min_deviation) {
            return fail("min_deviation must lie in [0, 0.5]");
        }
        if !(0.0..=1.0).contains(&self.spam_threshold) {
            return fail("spam_threshold must lie in [0, 1]");
        }
        if self.max_discriminators == 0 {
            return fail("max_discriminators must be at least 1");
        }
        if self.terms_for_good == 0 || self.terms_for_spam == 0 {
            return fail("terms_for_good and terms_for_spam must be at least 1");
        }
        if self.cache_size == 0 {
            return fail("cache_size must be at least 1");
        }
        Ok(())
    }

    /// The scorer parameters this configuration implies.
    pub fn scorer(&self) -> BayesScorer {
        BayesScorer {
            min_token_count: self.min_token_count,
            max_discriminators: self.max_discriminators,
            min_deviation: self.min_deviation,
            terms_for_good: self.terms_for_good,
            terms_for_spam: self.terms_for_spam,
            min_prob: self.min_prob,
            max_prob: self.max_prob,
            default_prob: self.default_prob,
        }
    }
}
