/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! End-to-end tests over real stores in temporary directories.

#[cfg(test)]
mod classifier;
#[cfg(test)]
mod scenarios;
#[cfg(test)]
mod store_ops;

#[cfg(test)]
pub(crate) mod common {
    use mailprobe::{Classifier, FilterConfig};
    use tempfile::TempDir;

    pub fn open_classifier(config: FilterConfig) -> (TempDir, Classifier) {
        let dir = TempDir::new().unwrap();
        let classifier = Classifier::open(dir.path(), config, false).unwrap();
        (dir, classifier)
    }

    pub fn message(subject: &str, body: &str) -> Vec<u8> {
        format!("From: someone@example.com\nSubject: {subject}\n\n{body}\n").into_bytes()
    }

    pub fn export_string(classifier: &Classifier) -> String {
        let mut out = Vec::new();
        classifier.export(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }
}
