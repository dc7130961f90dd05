/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod html;
pub mod phrase;
pub mod url;
pub mod word;

use std::fmt;

/// Longest `prefix/lexeme` string the store will accept, in bytes.
pub const MAX_TERM_BYTES: usize = 90;

/// Sentinel lexeme emitted for runs of non-ASCII input.
pub const NON_ASCII_LEXEME: &str = "nonascii";

/// A prefixed, normalized token extracted from a message.
///
/// The wire form is `prefix/lexeme`. Construction enforces the length
/// bounds, so a `Term` held anywhere in the pipeline is always storable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term(String);

impl Term {
    /// Builds a term from a provenance prefix and a lexeme, or `None`
    /// when the lexeme is empty or the combined form exceeds
    /// [`MAX_TERM_BYTES`].
    pub fn new(prefix: &str, lexeme: &str) -> Option<Term> {
        if lexeme.is_empty() || prefix.len() + 1 + lexeme.len() > MAX_TERM_BYTES {
            return None;
        }
        let mut text = String::with_capacity(prefix.len() + 1 + lexeme.len());
        text.push_str(prefix);
        text.push('/');
        text.push_str(lexeme);
        Some(Term(text))
    }

    /// Reconstructs a term from its stored wire form.
    pub fn from_raw(text: impl Into<String>) -> Option<Term> {
        let text = text.into();
        if text.is_empty() || text.len() > MAX_TERM_BYTES {
            None
        } else {
            Some(Term(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The provenance tag, e.g. `h.subj` or `body`.
    pub fn prefix(&self) -> &str {
        self.0.split_once('/').map_or("", |(p, _)| p)
    }

    pub fn lexeme(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(_, l)| l)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Term {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
