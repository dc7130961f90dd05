/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Statistical mail classification in the Graham/Robinson lineage.
//!
//! [`Classifier`] is the façade: it parses messages, turns them into
//! prefixed terms, keeps term frequencies in a local store and combines
//! them into a spam probability. Corrected judgements feed back through
//! [`Classifier::train`]; message digests make retraining idempotent.

pub mod classify;
pub mod config;
pub mod error;
pub mod message;
pub mod tokenize;

pub use classify::{batch::BatchSummary, Classifier, Verdict, STORE_FILE};
pub use config::{FilterConfig, Preset};
pub use error::{Error, Result};
pub use message::{source, Message};
pub use nlp::bayes::{classify::Discriminator, Class, Corpus, TermCounts};
pub use store::{dump::ImportReport, maintain::MaintenanceReport, read::StoreStats};
