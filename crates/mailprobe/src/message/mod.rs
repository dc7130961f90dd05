/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod parse;
pub mod source;

/// A parsed message, alive for one classification or training call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Headers in original order, duplicates preserved.
    pub headers: Vec<Header>,
    /// Leaf MIME parts in reading order. Non-text parts keep their
    /// content type but carry no text.
    pub parts: Vec<BodyPart>,
    /// MD5 over the normalized raw bytes; the idempotence key.
    pub digest: [u8; 16],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Original-case header name.
    pub name: String,
    /// Decoded value text, best effort.
    pub text: String,
    /// `local@host` forms when this is an address header.
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart {
    /// Lowercased `type/subtype`.
    pub content_type: String,
    pub charset: Option<String>,
    /// Decoded to UTF-8 with invalid sequences replaced; empty for
    /// non-text parts.
    pub text: String,
    pub is_html: bool,
}

impl Message {
    /// First value of the named header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.text.as_str())
    }

    /// All values of the named header, in order.
    pub fn headers_named<'x>(&'x self, name: &'x str) -> impl Iterator<Item = &'x Header> + 'x {
        self.headers
            .iter()
            .filter(move |h| h.name.eq_ignore_ascii_case(name))
    }

    pub fn digest_hex(&self) -> String {
        let mut out = String::with_capacity(32);
        for byte in &self.digest {
            use std::fmt::Write;
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}
