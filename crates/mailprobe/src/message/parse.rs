/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use mail_parser::{HeaderValue, MessageParser, MimeHeaders, PartType};

use super::{BodyPart, Header, Message};
use crate::error::{Error, Result};

impl Message {
    /// Parses one message from raw bytes.
    ///
    /// Parsing is best effort: broken MIME degrades to whatever decodes,
    /// and only a message with no headers and no body at all is rejected.
    pub fn parse(raw: &[u8]) -> Result<Message> {
        let digest = digest_raw(raw);
        let parsed = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| Error::MalformedMessage("no parseable content".into()))?;

        let mut headers = Vec::with_capacity(parsed.headers().len());
        for header in parsed.headers() {
            let addresses = header
                .value()
                .as_address()
                .map(|address| {
                    address
                        .iter()
                        .filter_map(|addr| addr.address())
                        .map(|addr| addr.to_string())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            let text = match header.value() {
                HeaderValue::Text(text) => text.to_string(),
                HeaderValue::TextList(list) => list
                    .iter()
                    .map(|text| text.as_ref())
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => String::from_utf8_lossy(
                    raw.get(header.offset_start..header.offset_end)
                        .unwrap_or_default(),
                )
                .trim()
                .to_string(),
            };
            headers.push(Header {
                name: header.name.as_str().to_string(),
                text,
                addresses,
            });
        }

        // Depth-first over nested message/rfc822 parts with an explicit
        // stack; attacker-supplied nesting depth never touches the call
        // stack.
        let mut parts = Vec::new();
        let mut part_stack = Vec::new();
        let mut part_iter = parsed.parts.iter();
        loop {
            while let Some(part) = part_iter.next() {
                let (text, is_html) = match &part.body {
                    PartType::Text(text) => (text.to_string(), false),
                    PartType::Html(html) => (html.to_string(), true),
                    PartType::Message(nested) => {
                        part_stack.push(part_iter);
                        part_iter = nested.parts.iter();
                        continue;
                    }
                    PartType::Multipart(_) => continue,
                    // binary attachments keep their content type only
                    _ => (String::new(), false),
                };
                let (content_type, charset) = match part.content_type() {
                    Some(ct) => {
                        let mut name = ct.ctype().to_ascii_lowercase();
                        if let Some(subtype) = ct.subtype() {
                            name.push('/');
                            name.push_str(&subtype.to_ascii_lowercase());
                        }
                        (
                            name,
                            ct.attribute("charset").map(|c| c.to_ascii_lowercase()),
                        )
                    }
                    None => (
                        if is_html { "text/html" } else { "text/plain" }.to_string(),
                        None,
                    ),
                };
                parts.push(BodyPart {
                    content_type,
                    charset,
                    text,
                    is_html,
                });
            }
            match part_stack.pop() {
                Some(iter) => part_iter = iter,
                None => break,
            }
        }

        if headers.is_empty() && parts.iter().all(|p| p.text.is_empty()) {
            return Err(Error::MalformedMessage(
                "no headers found and body is empty".into(),
            ));
        }

        Ok(Message {
            headers,
            parts,
            digest,
        })
    }
}

/// MD5 of the raw bytes with CRLF folded to LF and trailing whitespace
/// stripped per line, so the digest survives OS line-ending differences
/// and mbox round trips.
pub fn digest_raw(raw: &[u8]) -> [u8; 16] {
    let mut normalized = Vec::with_capacity(raw.len() + 1);
    for line in raw.split(|&b| b == b'\n') {
        let mut end = line.len();
        while end > 0 && matches!(line[end - 1], b' ' | b'\t' | b'\r') {
            end -= 1;
        }
        normalized.extend_from_slice(&line[..end]);
        normalized.push(b'\n');
    }
    // fold any number of trailing newlines into exactly one
    while normalized.ends_with(b"\n") {
        normalized.pop();
    }
    normalized.push(b'\n');
    md5::compute(&normalized).0
}
