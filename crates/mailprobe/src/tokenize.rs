/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use nlp::tokenizers::{
    html::strip_html,
    phrase::PhraseTokenizer,
    url::{find_urls, UrlParts},
    word::{HeaderTokenizer, WordTokenizer},
    Term,
};

use crate::{config::FilterConfig, message::Message};

/// Non-structural headers that still produce terms; anything else is
/// ignored so hostile mail cannot mint unbounded prefixes.
const HEADER_WHITELIST: &[&str] = &[
    "x-mailer",
    "user-agent",
    "sender",
    "list-id",
    "precedence",
    "organization",
    "x-priority",
];

/// Emits the term stream for one message.
///
/// Header terms come first, then body terms in reading order, so phrase
/// windows are deterministic. Every emission is bounded by the term
/// length cap; oversized or empty lexemes vanish here.
pub fn tokenize(message: &Message, config: &FilterConfig) -> Vec<Term> {
    let mut terms = Vec::new();

    for header in &message.headers {
        let name = header.name.to_ascii_lowercase();
        match name.as_str() {
            "subject" => {
                for word in HeaderTokenizer::new(&header.text, config.replace_non_ascii) {
                    push(&mut terms, "h.subj", &word);
                }
            }
            "from" | "to" | "cc" | "reply-to" => {
                let prefix = match name.as_str() {
                    "from" => "h.from",
                    "to" => "h.to",
                    "cc" => "h.cc",
                    _ => "h.replyto",
                };
                address_terms(prefix, &header.addresses, &mut terms);
            }
            "received" => received_terms(&header.text, &mut terms),
            "content-type" => {
                push(&mut terms, "h.ctype", &header.text.to_ascii_lowercase());
            }
            _ if HEADER_WHITELIST.contains(&name.as_str()) => {
                let prefix = format!("h.{name}");
                for word in HeaderTokenizer::new(&header.text, config.replace_non_ascii) {
                    push(&mut terms, &prefix, &word);
                }
            }
            _ => {}
        }
    }

    // part-level content types, stub parts included
    for part in &message.parts {
        push(&mut terms, "h.ctype", &part.content_type);
        if let Some(charset) = &part.charset {
            push(&mut terms, "h.ctype", charset);
        }
    }

    if config.ignore_body {
        return terms;
    }

    for part in &message.parts {
        if part.text.is_empty() {
            continue;
        }

        let (text, tags, mut urls) = if part.is_html {
            let html = strip_html(&part.text);
            (html.text, html.tags, html.urls)
        } else {
            (part.text.clone(), Vec::new(), Vec::new())
        };

        for tag in &tags {
            push(&mut terms, "html.tag", tag);
        }

        urls.extend(find_urls(&text).map(str::to_string));
        for url in &urls {
            if let Some(parts) = UrlParts::parse(url) {
                push(&mut terms, "url.host", &parts.host);
                if let Some(segment) = parts.first_segment {
                    push(&mut terms, "url.path", &segment);
                }
            }
        }

        let words = WordTokenizer::new(&text, config.replace_non_ascii)
            .map(|word| word.into_owned())
            .collect::<Vec<_>>();
        for word in &words {
            push(&mut terms, "body", word);
        }
        // phrases stay inside one body part
        for phrase in PhraseTokenizer::new(words.into_iter(), config.phrase_length) {
            push(&mut terms, "phrase", &phrase);
        }
    }

    terms
}

fn push(terms: &mut Vec<Term>, prefix: &str, lexeme: &str) {
    if let Some(term) = Term::new(prefix, lexeme) {
        terms.push(term);
    }
}

fn address_terms(prefix: &str, addresses: &[String], terms: &mut Vec<Term>) {
    let host_prefix = format!("{prefix}.host");
    for address in addresses {
        match address.rsplit_once('@') {
            Some((local, host)) if !host.is_empty() => {
                push(terms, prefix, &local.to_ascii_lowercase());
                let host = host.to_ascii_lowercase();
                for label in host.split('.').filter(|label| !label.is_empty()) {
                    push(terms, &host_prefix, label);
                }
                push(terms, &host_prefix, &host);
            }
            _ => push(terms, prefix, &address.to_ascii_lowercase()),
        }
    }
}

/// Hostnames and IP literals from one Received header. IPv4 addresses
/// are emitted whole and as their /24 prefix.
fn received_terms(text: &str, terms: &mut Vec<Term>) {
    for token in text.split(|c: char| {
        c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | ';' | ',' | '<' | '>')
    }) {
        let token = token.trim_matches(|c: char| matches!(c, '.' | ':'));
        if token.is_empty() {
            continue;
        }
        if let Some(prefix24) = ipv4_prefix24(token) {
            push(terms, "h.rcvd", token);
            push(terms, "h.rcvd.ip24", &prefix24);
        } else if token.contains('.')
            && token.chars().any(|c| c.is_ascii_alphabetic())
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            push(terms, "h.rcvd", &token.to_ascii_lowercase());
        }
    }
}

fn ipv4_prefix24(token: &str) -> Option<String> {
    let mut octets = [""; 4];
    let mut count = 0;
    for octet in token.split('.') {
        if count == 4
            || octet.is_empty()
            || octet.len() > 3
            || !octet.chars().all(|c| c.is_ascii_digit())
            || octet.parse::<u16>().map_or(true, |value| value > 255)
        {
            return None;
        }
        octets[count] = octet;
        count += 1;
    }
    if count == 4 {
        Some(octets[..3].join("."))
    } else {
        None
    }
}
