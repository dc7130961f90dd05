/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::sync::atomic::AtomicBool;

use mailprobe::{Class, Classifier, Error, FilterConfig, Message};
use tempfile::TempDir;

use crate::common::{message, open_classifier};

#[test]
fn removing_untrained_message_is_unknown() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    let parsed = Message::parse(&message("never", "trained at all")).unwrap();
    assert!(matches!(
        classifier.remove(&parsed),
        Err(Error::UnknownMessage(_))
    ));
}

#[test]
fn read_only_open_requires_existing_store() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        Classifier::open(dir.path(), FilterConfig::default(), true),
        Err(Error::StoreUnavailable(_))
    ));

    // create it, then read-only works and rejects writes
    drop(Classifier::open(dir.path(), FilterConfig::default(), false).unwrap());
    let reader = Classifier::open(dir.path(), FilterConfig::default(), true).unwrap();
    assert!(reader
        .classify_bytes(&message("fine", "reading is allowed"))
        .is_ok());
    assert!(reader
        .train_bytes(&message("no", "writing is not"), Class::Good)
        .is_err());
}

#[test]
fn malformed_bytes_are_rejected() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    assert!(matches!(
        classifier.classify_bytes(b""),
        Err(Error::MalformedMessage(_))
    ));
}

#[test]
fn batch_counts_malformed_messages() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    let cancel = AtomicBool::new(false);

    let batch = vec![
        message("one", "perfectly fine message"),
        Vec::new(), // unparseable
        message("two", "another fine message"),
    ];
    let summary = classifier.train_all(batch, Class::Good, &cancel).unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.trained, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(classifier.store().corpus().unwrap().good, 2);
}

#[test]
fn cancelled_batch_keeps_committed_prefix() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    let cancel = AtomicBool::new(true);

    let summary = classifier
        .train_all(
            vec![message("a", "aaa bbb"), message("b", "ccc ddd")],
            Class::Spam,
            &cancel,
        )
        .unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(classifier.store().corpus().unwrap().spam, 0);
}

#[test]
fn parallel_scoring_matches_serial() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    for n in 0..30 {
        classifier
            .train_bytes(
                &message(&format!("bulk {n}"), "lottery pills casino jackpot"),
                Class::Spam,
            )
            .unwrap();
        classifier
            .train_bytes(
                &message(&format!("work {n}"), "meeting agenda minutes follow"),
                Class::Good,
            )
            .unwrap();
    }

    let probes: Vec<Vec<u8>> = (0..16)
        .map(|n| {
            if n % 2 == 0 {
                message("p", "lottery casino jackpot")
            } else {
                message("p", "meeting agenda minutes")
            }
        })
        .collect();

    let serial: Vec<f64> = probes
        .iter()
        .map(|raw| classifier.classify_bytes(raw).unwrap().score)
        .collect();
    let parallel: Vec<f64> = classifier
        .classify_all(&probes, 4)
        .into_iter()
        .map(|verdict| verdict.unwrap().score)
        .collect();

    for (serial, parallel) in serial.iter().zip(&parallel) {
        assert_eq!(serial.to_bits(), parallel.to_bits());
    }
}

#[test]
fn classify_sees_completed_training() {
    // linearizability at the API level: train returns, then classify
    // started afterwards must see the effect
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    let probe = message("x", "unmistakably spammy vocabulary");

    let before = classifier.classify_bytes(&probe).unwrap();
    assert!(before.terms.is_empty());

    for n in 0..10 {
        classifier
            .train_bytes(
                &message(&format!("s {n}"), "unmistakably spammy vocabulary"),
                Class::Spam,
            )
            .unwrap();
    }

    let after = classifier.classify_bytes(&probe).unwrap();
    assert!(!after.terms.is_empty());
    assert!(after.score > before.score);
}

#[test]
fn purge_respects_min_token_count() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    // five sightings of one vocabulary, one sighting of another
    for n in 0..5 {
        classifier
            .train_bytes(&message(&format!("r {n}"), "repeated steady words"), Class::Good)
            .unwrap();
    }
    classifier
        .train_bytes(&message("lone", "rare singleton vocabulary"), Class::Good)
        .unwrap();

    let removed = classifier.purge().unwrap();
    assert!(removed > 0);

    // the repeated body words survive the purge
    let record = classifier.store().get("body/repeated").unwrap();
    assert!(record.is_some());
    let gone = classifier.store().get("body/rare").unwrap();
    assert!(gone.is_none());
}

#[test]
fn ignore_body_classifier_uses_headers_only() {
    let headers_only = FilterConfig {
        ignore_body: true,
        ..FilterConfig::default()
    };

    let (_dir, classifier) = open_classifier(headers_only);
    for n in 0..10 {
        classifier
            .train_bytes(&message(&format!("n {n}"), "body words galore"), Class::Spam)
            .unwrap();
    }
    assert!(classifier.store().get("body/galore").unwrap().is_none());
    assert!(classifier.store().get("h.from/someone").unwrap().is_some());
}
