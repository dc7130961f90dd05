/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use store::StoreError;

/// Everything the classifier can fail with.
///
/// Message-level errors (`MalformedMessage`, `UnknownMessage`) are local
/// to one input and are counted rather than fatal in batch operations;
/// store-level errors abort the operation that hit them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("store corrupt: {0}")]
    StoreCorrupt(String),

    #[error("store locked by another process")]
    StoreBusy,

    #[error("message {0} was never trained")]
    UnknownMessage(String),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { .. } => Error::StoreUnavailable(err.to_string()),
            StoreError::Corrupt(reason) => Error::StoreCorrupt(reason),
            StoreError::Busy => Error::StoreBusy,
            StoreError::Io(err) => Error::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
