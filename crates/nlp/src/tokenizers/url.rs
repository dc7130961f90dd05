/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

/// Host and leading path segment of a link, normalized for term emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub host: String,
    pub first_segment: Option<String>,
}

impl UrlParts {
    /// Splits a URL or bare `www.` reference into its classifier-relevant
    /// pieces. The host is lowercased with any port and userinfo removed;
    /// only the first path segment is kept.
    pub fn parse(url: &str) -> Option<UrlParts> {
        let rest = match url.split_once("://") {
            Some((scheme, rest))
                if !scheme.is_empty()
                    && scheme.len() <= 8
                    && scheme.chars().all(|c| c.is_ascii_alphabetic()) =>
            {
                rest
            }
            Some(_) => return None,
            None => url,
        };

        let (authority, path) = match rest.find(['/', '?', '#']) {
            Some(pos) if rest.as_bytes()[pos] == b'/' => (&rest[..pos], &rest[pos + 1..]),
            Some(pos) => (&rest[..pos], ""),
            None => (rest, ""),
        };

        let host_port = authority
            .rsplit_once('@')
            .map_or(authority, |(_, host)| host);
        let host = host_port
            .split_once(':')
            .map_or(host_port, |(host, _)| host)
            .trim_matches('.');
        if host.is_empty() {
            return None;
        }

        let first_segment = path
            .split(['/', '?', '#'])
            .next()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Some(UrlParts {
            host: host.to_ascii_lowercase(),
            first_segment,
        })
    }
}

/// Finds link references in plain body text: anything with a URL scheme
/// plus bare `www.` hosts, in reading order.
pub fn find_urls(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| {
        c.is_whitespace() || matches!(c, '<' | '>' | '"' | '\'' | '(' | ')' | ',')
    })
    .map(|token| token.trim_end_matches(['.', ';', ':', '!', '?']))
    .filter(|token| {
        let has_prefix = |p: &str| {
            token.len() > p.len()
                && token
                    .get(..p.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(p))
        };
        has_prefix("http://") || has_prefix("https://") || has_prefix("www.")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_url() {
        let parts = UrlParts::parse("http://WWW.Example.COM:8080/Buy/now?x=1").unwrap();
        assert_eq!(parts.host, "www.example.com");
        assert_eq!(parts.first_segment.as_deref(), Some("Buy"));
    }

    #[test]
    fn parse_bare_host() {
        let parts = UrlParts::parse("www.test.org").unwrap();
        assert_eq!(parts.host, "www.test.org");
        assert_eq!(parts.first_segment, None);
    }

    #[test]
    fn parse_strips_userinfo() {
        let parts = UrlParts::parse("http://user:pw@evil.example.net/track").unwrap();
        assert_eq!(parts.host, "evil.example.net");
        assert_eq!(parts.first_segment.as_deref(), Some("track"));
    }

    #[test]
    fn parse_rejects_empty_host() {
        assert_eq!(UrlParts::parse("http:///path"), None);
        assert_eq!(UrlParts::parse("1234://x"), None);
    }

    #[test]
    fn urls_in_text() {
        let found: Vec<_> =
            find_urls("Visit http://example.com or www.test.org. More at (https://a.b/c).")
                .collect();
        assert_eq!(found, ["http://example.com", "www.test.org", "https://a.b/c"]);
    }
}
