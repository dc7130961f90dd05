/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! The seed scenarios every release must hold.

use std::io::Cursor;

use mailprobe::{source, Class, Classifier, FilterConfig, Message};
use tempfile::TempDir;

use crate::common::{export_string, message, open_classifier};

const SPAM_WORDS: &str = "viagra lottery winner pills casino unsubscribe jackpot refinance";
const GOOD_WORDS: &str = "meeting quarterly report project deadline lunch review agenda";

fn train_corpus(classifier: &Classifier, count: usize) {
    for n in 0..count {
        classifier
            .train_bytes(&message(&format!("offer {n}"), SPAM_WORDS), Class::Spam)
            .unwrap();
        classifier
            .train_bytes(&message(&format!("standup {n}"), GOOD_WORDS), Class::Good)
            .unwrap();
    }
}

// S1: a classifier with an empty store has no evidence either way.
#[test]
fn empty_store_scores_default_prob() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    let verdict = classifier
        .classify_bytes(&message("anything", "arbitrary words in here"))
        .unwrap();
    assert_eq!(verdict.score, 0.4);
    assert!(!verdict.is_spam);
    assert!(verdict.terms.is_empty());
}

// S2: after training both vocabularies, each side is called decisively.
#[test]
fn trained_vocabularies_separate_cleanly() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    train_corpus(&classifier, 100);

    let spam = classifier
        .classify_bytes(&message("x", SPAM_WORDS))
        .unwrap();
    assert!(spam.score >= 0.99, "spam side scored {}", spam.score);
    assert!(spam.is_spam);

    let good = classifier
        .classify_bytes(&message("x", GOOD_WORDS))
        .unwrap();
    assert!(good.score <= 0.01, "good side scored {}", good.score);
    assert!(!good.is_spam);
}

// S3: mbox in, export, import into a fresh store; nothing lost.
#[test]
fn mbox_train_export_import_round_trip() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());

    let mbox = b"From a@example.com Mon Jan  1 10:00:00 2024\n\
From: a@example.com\nSubject: one\n\nfirst spam body here\n\n\
From b@example.com Mon Jan  1 11:00:00 2024\n\
From: b@example.com\nSubject: two\n\nsecond spam body here\n\n\
From c@example.com Mon Jan  1 12:00:00 2024\n\
From: c@example.com\nSubject: three\n\nthird spam body here\n";

    let messages = source::read_bytes(mbox.to_vec());
    assert_eq!(messages.len(), 3);
    let mut digests = Vec::new();
    for raw in &messages {
        let parsed = Message::parse(raw).unwrap();
        digests.push(parsed.digest);
        classifier.train(&parsed, Class::Spam).unwrap();
    }

    let dump = export_string(&classifier);

    let fresh_dir = TempDir::new().unwrap();
    let fresh = Classifier::open(fresh_dir.path(), FilterConfig::default(), false).unwrap();
    fresh.import(Cursor::new(dump.as_bytes())).unwrap();

    let corpus = fresh.store().corpus().unwrap();
    assert_eq!((corpus.good, corpus.spam), (0, 3));
    for digest in &digests {
        assert_eq!(fresh.store().contains_digest(digest).unwrap(), Some(Class::Spam));
    }
}

// S4: the digest set makes retraining a no-op.
#[test]
fn training_is_idempotent() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    let raw = message("hello", "some ordinary text");

    assert!(classifier.train_bytes(&raw, Class::Spam).unwrap());
    assert!(!classifier.train_bytes(&raw, Class::Spam).unwrap());
    assert!(!classifier.train_bytes(&raw, Class::Spam).unwrap());

    let corpus = classifier.store().corpus().unwrap();
    assert_eq!((corpus.good, corpus.spam), (0, 1));
}

// S5: maintenance with no grace period drops every single-sighting term
// but leaves the corpus counters alone.
#[test]
fn maintenance_expires_single_sightings() {
    let config = FilterConfig {
        expiry_days: 0,
        ..FilterConfig::default()
    };
    let (_dir, classifier) = open_classifier(config);

    classifier
        .train_bytes(&message("once", "seldom words appear here"), Class::Good)
        .unwrap();
    // train and untrain nothing else; every term has total count 1
    assert!(classifier.store().term_count().unwrap() > 0);

    let report = classifier.maintain(Classifier::today()).unwrap();
    assert!(report.terms_removed > 0);
    assert_eq!(classifier.store().term_count().unwrap(), 0);

    let corpus = classifier.store().corpus().unwrap();
    assert_eq!((corpus.good, corpus.spam), (1, 0));
}

// S6: selective training pulls a mislabeled ham back under the threshold.
#[test]
fn selective_training_corrects_false_positive() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());

    // poison the store: the ham vocabulary is only ever seen in spam
    for n in 0..20 {
        classifier
            .train_bytes(&message(&format!("blast {n}"), GOOD_WORDS), Class::Spam)
            .unwrap();
    }

    let ham = message("notes", GOOD_WORDS);
    let parsed = Message::parse(&ham).unwrap();
    let before = classifier.classify(&parsed).unwrap();
    assert!(before.is_spam, "setup should mislabel, scored {}", before.score);

    assert!(classifier
        .train_if_misclassified(&parsed, Class::Good)
        .unwrap());

    let after = classifier.classify(&parsed).unwrap();
    assert!(
        after.score < classifier.config().spam_threshold,
        "still mislabeled at {}",
        after.score
    );

    // and now that it agrees, selective training stops touching the store
    assert!(!classifier
        .train_if_misclassified(&parsed, Class::Good)
        .unwrap());
}

// Property 1: train then remove returns the store to its prior state.
#[test]
fn train_remove_round_trips() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    let baseline = export_string(&classifier);

    let raw = message("transient", "words that will vanish again");
    let parsed = Message::parse(&raw).unwrap();
    classifier.train(&parsed, Class::Spam).unwrap();
    assert_ne!(export_string(&classifier), baseline);

    classifier.remove(&parsed).unwrap();
    classifier.maintain(Classifier::today()).unwrap();
    assert_eq!(export_string(&classifier), baseline);
}

// Property 3: good-then-spam equals spam-from-scratch.
#[test]
fn reclassification_is_symmetric() {
    let raw = message("flip", "words moving between classes");

    let (_dir_a, reclassified) = open_classifier(FilterConfig::default());
    reclassified.train_bytes(&raw, Class::Good).unwrap();
    assert!(reclassified.train_bytes(&raw, Class::Spam).unwrap());

    let (_dir_b, direct) = open_classifier(FilterConfig::default());
    direct.train_bytes(&raw, Class::Spam).unwrap();

    assert_eq!(export_string(&reclassified), export_string(&direct));
}

// Property 5: more spam evidence never lowers a spam score.
#[test]
fn evidence_is_monotone() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    train_corpus(&classifier, 20);

    let target = message("x", SPAM_WORDS);
    let before = classifier.classify_bytes(&target).unwrap().score;

    classifier
        .train_bytes(&message("one more", SPAM_WORDS), Class::Spam)
        .unwrap();
    let after = classifier.classify_bytes(&target).unwrap().score;

    assert!(after >= before, "score dropped from {before} to {after}");
}

// Property 7: digest-level idempotence across line-ending variants.
#[test]
fn line_ending_variants_are_one_message() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());

    let lf = b"Subject: same\n\nHello world\n".to_vec();
    let crlf = b"Subject: same\r\n\r\nHello world  \r\n".to_vec();

    assert!(classifier.train_bytes(&lf, Class::Spam).unwrap());
    assert!(!classifier.train_bytes(&crlf, Class::Spam).unwrap());

    let corpus = classifier.store().corpus().unwrap();
    assert_eq!(corpus.spam, 1);
}

// Property 6: an imported store scores exactly like its source.
#[test]
fn import_preserves_scores() {
    let (_dir, classifier) = open_classifier(FilterConfig::default());
    train_corpus(&classifier, 30);

    let probes = [
        message("a", SPAM_WORDS),
        message("b", GOOD_WORDS),
        message("c", "viagra meeting lottery report"),
        message("d", "completely unseen vocabulary"),
    ];
    let dump = export_string(&classifier);

    let fresh_dir = TempDir::new().unwrap();
    let fresh = Classifier::open(fresh_dir.path(), FilterConfig::default(), false).unwrap();
    fresh.import(Cursor::new(dump.as_bytes())).unwrap();

    for probe in &probes {
        let original = classifier.classify_bytes(probe).unwrap().score;
        let imported = fresh.classify_bytes(probe).unwrap().score;
        assert_eq!(original.to_bits(), imported.to_bits());
    }
}
