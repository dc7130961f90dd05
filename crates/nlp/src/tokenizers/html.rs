/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::{iter::Peekable, str::CharIndices};

/// The pieces of an HTML body a classifier cares about: the visible text
/// with entities resolved, the opening tag names in document order, and
/// every `href`/`src` attribute value.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct HtmlParts {
    pub text: String,
    pub tags: Vec<String>,
    pub urls: Vec<String>,
}

/// Strips markup from an HTML fragment.
///
/// Best-effort by design: unbalanced or hostile markup must never fail,
/// only degrade. `<script>` and `<style>` contents are dropped, comments
/// are skipped, and tags act as word boundaries in the extracted text.
pub fn strip_html(input: &str) -> HtmlParts {
    let mut parts = HtmlParts::default();
    let mut iter = input.char_indices().peekable();
    let mut hidden: Option<String> = None;

    while let Some((pos, ch)) = iter.next() {
        match ch {
            '<' => {
                if input[pos + 1..].starts_with("!--") {
                    skip_comment(&mut iter);
                    continue;
                }
                if let Some(tag) = read_tag(&mut iter, &mut parts.urls) {
                    if let Some(open) = &hidden {
                        if tag.closing && tag.name == *open {
                            hidden = None;
                        }
                    } else if !tag.closing {
                        if matches!(tag.name.as_str(), "script" | "style") {
                            hidden = Some(tag.name.clone());
                        }
                        parts.tags.push(tag.name);
                    }
                }
                if !parts.text.ends_with(' ') && !parts.text.is_empty() {
                    parts.text.push(' ');
                }
            }
            '&' if hidden.is_none() => match read_entity(input, &mut iter) {
                Some(decoded) => parts.text.push_str(&decoded),
                None => parts.text.push('&'),
            },
            _ if hidden.is_none() => parts.text.push(ch),
            _ => {}
        }
    }

    parts
}

/// Resolves character references in header-supplied or attribute text.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut iter = input.char_indices().peekable();
    while let Some((_, ch)) = iter.next() {
        if ch == '&' {
            match read_entity(input, &mut iter) {
                Some(decoded) => out.push_str(&decoded),
                None => out.push('&'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

struct Tag {
    name: String,
    closing: bool,
}

fn skip_comment(iter: &mut Peekable<CharIndices<'_>>) {
    let mut dashes = 0;
    for (_, ch) in iter.by_ref() {
        match ch {
            '-' => dashes += 1,
            '>' if dashes >= 2 => return,
            _ => dashes = 0,
        }
    }
}

fn read_tag(iter: &mut Peekable<CharIndices<'_>>, urls: &mut Vec<String>) -> Option<Tag> {
    let closing = matches!(iter.peek(), Some((_, '/')));
    if closing {
        iter.next();
    }

    let mut name = String::new();
    while let Some(&(_, ch)) = iter.peek() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch.to_ascii_lowercase());
            iter.next();
        } else {
            break;
        }
    }

    // Attribute scan, quote-aware; only href/src values are harvested.
    let mut attr = String::new();
    let mut in_quote = None::<char>;
    while let Some((_, ch)) = iter.next() {
        match (ch, in_quote) {
            ('>', None) => break,
            ('"' | '\'', None) => in_quote = Some(ch),
            (q, Some(open)) if q == open => in_quote = None,
            ('=', None) if matches!(attr.as_str(), "href" | "src") => {
                if let Some(value) = read_attr_value(iter) {
                    urls.push(decode_entities(&value));
                }
                attr.clear();
            }
            (c, None) if c.is_ascii_alphanumeric() || c == '-' => {
                attr.push(c.to_ascii_lowercase());
            }
            (_, None) => attr.clear(),
            _ => {}
        }
    }

    if name.is_empty() {
        None
    } else {
        Some(Tag { name, closing })
    }
}

fn read_attr_value(iter: &mut Peekable<CharIndices<'_>>) -> Option<String> {
    // skip whitespace after '='
    while matches!(iter.peek(), Some((_, c)) if c.is_ascii_whitespace()) {
        iter.next();
    }
    let quote = match iter.peek() {
        Some(&(_, c @ ('"' | '\''))) => {
            iter.next();
            Some(c)
        }
        _ => None,
    };
    let mut value = String::new();
    while let Some(&(_, ch)) = iter.peek() {
        let done = match quote {
            Some(q) => ch == q,
            None => ch.is_ascii_whitespace() || ch == '>',
        };
        if done {
            if quote.is_some() {
                iter.next();
            }
            break;
        }
        value.push(ch);
        iter.next();
    }
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn read_entity(input: &str, iter: &mut Peekable<CharIndices<'_>>) -> Option<String> {
    let start = iter.peek()?.0;
    // entities are short; give up quickly on stray ampersands
    let end = input[start..]
        .char_indices()
        .take(10)
        .find(|(_, c)| *c == ';')
        .map(|(pos, _)| start + pos)?;
    let entity = &input[start..end];

    let decoded = match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => entity
            .strip_prefix("#x")
            .or_else(|| entity.strip_prefix("#X"))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
            .and_then(char::from_u32),
    }?;

    while matches!(iter.peek(), Some(&(pos, _)) if pos <= end) {
        iter.next();
    }
    Some(decoded.to_string())
}
