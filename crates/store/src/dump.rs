/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::{
    borrow::Cow,
    io::{BufRead, Write},
    path::Path,
};

use rusqlite::{params, TransactionBehavior};

use crate::{
    into_error,
    read::{class_from_i64, class_to_i64, read_corpus},
    Class, Result, StoreError, TermStore,
};

const DUMP_HEADER: &str = "#mailprobe-export v1";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub terms: u64,
    pub digests: u64,
}

impl TermStore {
    /// Writes the portable text dump: counters, term rows, digest rows.
    ///
    /// Rows are ordered, so equal stores produce byte-identical dumps.
    pub fn export<W: Write>(&self, out: &mut W) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction().map_err(into_error)?;

        let corpus = read_corpus(&tx)?;
        writeln!(out, "{DUMP_HEADER}")?;
        writeln!(out, "#good {}", corpus.good)?;
        writeln!(out, "#spam {}", corpus.spam)?;

        {
            let mut stmt = tx
                .prepare_cached(
                    "SELECT term, good, spam, last_seen FROM terms ORDER BY term",
                )
                .map_err(into_error)?;
            let mut rows = stmt.query([]).map_err(into_error)?;
            while let Some(row) = rows.next().map_err(into_error)? {
                let term: String = row.get(0).map_err(into_error)?;
                let good: u32 = row.get(1).map_err(into_error)?;
                let spam: u32 = row.get(2).map_err(into_error)?;
                let last_seen: u32 = row.get(3).map_err(into_error)?;
                writeln!(out, "{}\t{good}\t{spam}\t{last_seen}", escape_term(&term))?;
            }
        }

        writeln!(out, "#digests")?;
        {
            let mut stmt = tx
                .prepare_cached("SELECT digest, class FROM digests ORDER BY digest")
                .map_err(into_error)?;
            let mut rows = stmt.query([]).map_err(into_error)?;
            while let Some(row) = rows.next().map_err(into_error)? {
                let digest: Vec<u8> = row.get(0).map_err(into_error)?;
                let class = class_from_i64(row.get(1).map_err(into_error)?)?;
                writeln!(out, "{}\t{}", to_hex(&digest), class.as_str())?;
            }
        }
        writeln!(out, "#end")?;

        Ok(())
    }

    /// Loads a text dump produced by [`TermStore::export`].
    ///
    /// Counters are set to the dump's values; term and digest rows replace
    /// rows with the same key. Everything lands in one transaction, so a
    /// malformed dump leaves the store untouched.
    pub fn import<R: BufRead>(&self, input: R) -> Result<ImportReport> {
        self.writable()?;
        let mut report = ImportReport::default();

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(into_error)?;
        {
            let mut insert_term = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO terms (term, good, spam, last_seen) \
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(into_error)?;
            let mut insert_digest = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO digests (digest, class) VALUES (?1, ?2)",
                )
                .map_err(into_error)?;
            let mut set_meta = tx
                .prepare_cached(
                    "INSERT INTO meta (key, value) VALUES (?1, ?2) \
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                )
                .map_err(into_error)?;

            let bad = |line_no: usize, what: &str| {
                StoreError::Corrupt(format!("dump line {line_no}: {what}"))
            };

            #[derive(PartialEq)]
            enum Section {
                Header,
                Terms,
                Digests,
                End,
            }
            let mut section = Section::Header;
            let mut seen_good = false;
            let mut seen_spam = false;

            for (pos, line) in input.lines().enumerate() {
                let line = line?;
                let line_no = pos + 1;
                match section {
                    Section::Header => {
                        if line_no == 1 {
                            if line != DUMP_HEADER {
                                return Err(bad(line_no, "not a mailprobe export"));
                            }
                            continue;
                        }
                        let counter = if let Some(value) = line.strip_prefix("#good ") {
                            seen_good = true;
                            Some(("good_messages", value))
                        } else if let Some(value) = line.strip_prefix("#spam ") {
                            seen_spam = true;
                            Some(("spam_messages", value))
                        } else {
                            None
                        };
                        if let Some((key, value)) = counter {
                            let value: u64 =
                                value.parse().map_err(|_| bad(line_no, "bad counter"))?;
                            set_meta
                                .execute(params![key, value as i64])
                                .map_err(into_error)?;
                            if seen_good && seen_spam {
                                section = Section::Terms;
                            }
                        } else {
                            return Err(bad(line_no, "expected counter lines"));
                        }
                    }
                    Section::Terms => {
                        if line == "#digests" {
                            section = Section::Digests;
                            continue;
                        }
                        let mut fields = line.split('\t');
                        let term = unescape_term(fields.next().unwrap_or_default())
                            .ok_or_else(|| bad(line_no, "bad term escape"))?;
                        let good: u32 = fields
                            .next()
                            .and_then(|v| v.parse().ok())
                            .ok_or_else(|| bad(line_no, "bad good count"))?;
                        let spam: u32 = fields
                            .next()
                            .and_then(|v| v.parse().ok())
                            .ok_or_else(|| bad(line_no, "bad spam count"))?;
                        let last_seen: u32 = fields
                            .next()
                            .and_then(|v| v.parse().ok())
                            .ok_or_else(|| bad(line_no, "bad last_seen"))?;
                        insert_term
                            .execute(params![term, good, spam, last_seen])
                            .map_err(into_error)?;
                        report.terms += 1;
                    }
                    Section::Digests => {
                        if line == "#end" {
                            section = Section::End;
                            continue;
                        }
                        let (digest, class) = line
                            .split_once('\t')
                            .ok_or_else(|| bad(line_no, "bad digest row"))?;
                        let digest =
                            from_hex(digest).ok_or_else(|| bad(line_no, "bad digest hex"))?;
                        let class = match class {
                            "good" => Class::Good,
                            "spam" => Class::Spam,
                            _ => return Err(bad(line_no, "bad digest class")),
                        };
                        insert_digest
                            .execute(params![digest.as_slice(), class_to_i64(class)])
                            .map_err(into_error)?;
                        report.digests += 1;
                    }
                    Section::End => {
                        return Err(bad(line_no, "content after #end"));
                    }
                }
            }
            if section != Section::End {
                return Err(StoreError::Corrupt("dump truncated before #end".into()));
            }
        }
        tx.commit().map_err(into_error)?;
        self.cache.clear();

        Ok(report)
    }

    /// Copies the database file to `dst`. Requires that no writer is
    /// active; the WAL is folded into the main file first.
    pub fn backup(&self, dst: &Path) -> Result<u64> {
        if !self.read_only {
            let conn = self.conn()?;
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(into_error)?;
        }
        Ok(std::fs::copy(&self.path, dst)?)
    }

    /// Replaces the database file at `dst` with the backup at `src`.
    /// Must run while the store is not open anywhere.
    pub fn restore(src: &Path, dst: &Path) -> Result<u64> {
        if !src.exists() {
            return Err(StoreError::Unavailable {
                path: src.to_path_buf(),
                reason: "backup file does not exist".into(),
            });
        }
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = dst.as_os_str().to_owned();
            sidecar.push(suffix);
            let sidecar = Path::new(&sidecar);
            if sidecar.exists() {
                std::fs::remove_file(sidecar)?;
            }
        }
        Ok(std::fs::copy(src, dst)?)
    }
}

fn escape_term(term: &str) -> Cow<'_, str> {
    if !term.contains(['\t', '\n', '\\']) {
        return term.into();
    }
    let mut out = String::with_capacity(term.len() + 2);
    for ch in term.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out.into()
}

fn unescape_term(text: &str) -> Option<String> {
    if !text.contains('\\') {
        return if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        };
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next()? {
                't' => out.push('\t'),
                'n' => out.push('\n'),
                '\\' => out.push('\\'),
                _ => return None,
            }
        } else {
            out.push(ch);
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from_digit((byte >> 4) as u32, 16).unwrap_or('0'));
        out.push(char::from_digit((byte & 0xf) as u32, 16).unwrap_or('0'));
    }
    out
}

fn from_hex(text: &str) -> Option<[u8; 16]> {
    if text.len() != 32 || !text.is_ascii() {
        return None;
    }
    let mut out = [0u8; 16];
    for (pos, chunk) in text.as_bytes().chunks_exact(2).enumerate() {
        let hi = (chunk[0] as char).to_digit(16)?;
        let lo = (chunk[1] as char).to_digit(16)?;
        out[pos] = ((hi << 4) | lo) as u8;
    }
    Some(out)
}
