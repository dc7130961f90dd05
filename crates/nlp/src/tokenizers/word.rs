/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::{borrow::Cow, iter::Peekable, str::CharIndices};

use super::NON_ASCII_LEXEME;

/// Currency and percent signs travel with the surrounding digits, so
/// `$99` and `50%` survive word splitting as single tokens.
fn is_sign(ch: char) -> bool {
    matches!(ch, '$' | '%' | '¢' | '£' | '¥' | '€')
}

/// Splits body text into word tokens.
///
/// A token is a run of ASCII alphanumerics and sign characters; it is kept
/// when it contains at least two letters or carries a sign. Tokens with an
/// uppercase letter are folded to lowercase. With `replace_non_ascii`, any
/// run of other non-ASCII characters collapses to the `nonascii` sentinel;
/// without it, non-ASCII alphanumerics are ordinary word characters.
pub struct WordTokenizer<'x> {
    text: &'x str,
    iter: Peekable<CharIndices<'x>>,
    replace_non_ascii: bool,
}

impl<'x> WordTokenizer<'x> {
    pub fn new(text: &'x str, replace_non_ascii: bool) -> WordTokenizer<'x> {
        WordTokenizer {
            text,
            iter: text.char_indices().peekable(),
            replace_non_ascii,
        }
    }

    fn is_word_char(&self, ch: char) -> bool {
        ch.is_ascii_alphanumeric()
            || is_sign(ch)
            || (!self.replace_non_ascii && ch.is_alphanumeric())
    }
}

impl<'x> Iterator for WordTokenizer<'x> {
    type Item = Cow<'x, str>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((start, ch)) = self.iter.next() {
            if self.is_word_char(ch) {
                let mut end = start + ch.len_utf8();
                let mut letters = usize::from(ch.is_alphabetic());
                let mut has_sign = is_sign(ch);
                let mut has_upper = ch.is_uppercase();

                while let Some(&(pos, next)) = self.iter.peek() {
                    if !self.is_word_char(next) {
                        break;
                    }
                    letters += usize::from(next.is_alphabetic());
                    has_sign |= is_sign(next);
                    has_upper |= next.is_uppercase();
                    end = pos + next.len_utf8();
                    self.iter.next();
                }

                if letters >= 2 || has_sign {
                    let word = &self.text[start..end];
                    return Some(if has_upper {
                        word.to_lowercase().into()
                    } else {
                        word.into()
                    });
                }
            } else if self.replace_non_ascii && !ch.is_ascii() {
                while let Some(&(_, next)) = self.iter.peek() {
                    if next.is_ascii() || is_sign(next) {
                        break;
                    }
                    self.iter.next();
                }
                return Some(Cow::Borrowed(NON_ASCII_LEXEME));
            }
        }
        None
    }
}

/// Splits header values into words on non-alphanumeric boundaries,
/// preserving case. Sentinel handling matches [`WordTokenizer`].
pub struct HeaderTokenizer<'x> {
    text: &'x str,
    iter: Peekable<CharIndices<'x>>,
    replace_non_ascii: bool,
}

impl<'x> HeaderTokenizer<'x> {
    pub fn new(text: &'x str, replace_non_ascii: bool) -> HeaderTokenizer<'x> {
        HeaderTokenizer {
            text,
            iter: text.char_indices().peekable(),
            replace_non_ascii,
        }
    }

    fn is_word_char(&self, ch: char) -> bool {
        if self.replace_non_ascii {
            ch.is_ascii_alphanumeric()
        } else {
            ch.is_alphanumeric()
        }
    }
}

impl<'x> Iterator for HeaderTokenizer<'x> {
    type Item = Cow<'x, str>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((start, ch)) = self.iter.next() {
            if self.is_word_char(ch) {
                let mut end = start + ch.len_utf8();
                while let Some(&(pos, next)) = self.iter.peek() {
                    if !self.is_word_char(next) {
                        break;
                    }
                    end = pos + next.len_utf8();
                    self.iter.next();
                }
                return Some(self.text[start..end].into());
            } else if self.replace_non_ascii && !ch.is_ascii() {
                while let Some(&(_, next)) = self.iter.peek() {
                    if next.is_ascii() {
                        break;
                    }
                    self.iter.next();
                }
                return Some(Cow::Borrowed(NON_ASCII_LEXEME));
            }
        }
        None
    }
}
