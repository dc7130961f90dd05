/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::{fs, io::Cursor, path::Path};

use mail_parser::mailbox::{maildir, mbox::MessageIterator};
use tracing::warn;

use crate::error::Result;

/// Reads every raw message behind one input path.
///
/// A directory with `cur`/`new` subdirectories is a maildir; any other
/// directory is read file by file in name order. A file whose first
/// bytes are `From ` is an mbox; anything else is a single message.
pub fn read_path(path: &Path) -> Result<Vec<Vec<u8>>> {
    if fs::metadata(path)?.is_dir() {
        if path.join("cur").is_dir() || path.join("new").is_dir() {
            read_maildir(path)
        } else {
            let mut files = fs::read_dir(path)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect::<Vec<_>>();
            files.sort();
            let mut messages = Vec::new();
            for file in files {
                messages.extend(read_bytes(fs::read(&file)?));
            }
            Ok(messages)
        }
    } else {
        Ok(read_bytes(fs::read(path)?))
    }
}

/// Splits raw input into messages, detecting mbox framing by the
/// leading `From ` line. `>From ` escaping is reversed by the mbox
/// reader; a line that fails to frame is skipped, not fatal.
pub fn read_bytes(bytes: Vec<u8>) -> Vec<Vec<u8>> {
    if !bytes.starts_with(b"From ") {
        return vec![bytes];
    }
    let mut messages = Vec::new();
    for message in MessageIterator::new(Cursor::new(bytes.as_slice())) {
        match message {
            Ok(message) => messages.push(message.unwrap_contents()),
            Err(_) => {
                warn!("skipping unparseable mbox entry");
            }
        }
    }
    if messages.is_empty() {
        // not actually an mbox; treat the whole input as one message
        messages.push(bytes);
    }
    messages
}

fn read_maildir(path: &Path) -> Result<Vec<Vec<u8>>> {
    let mut messages = Vec::new();
    for folder in maildir::FolderIterator::new(path.to_path_buf(), None)? {
        let folder = folder?;
        for message in folder {
            match message {
                Ok(message) => messages.push(message.unwrap_contents()),
                Err(err) => {
                    warn!("skipping unreadable maildir entry: {err}");
                }
            }
        }
    }
    Ok(messages)
}
