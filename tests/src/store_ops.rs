/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Store-level behavior: atomic batches, clamping, expiry and snapshot
//! consistency under concurrent writers.

use std::time::Duration;

use nlp::tokenizers::Term;
use store::{
    write::{DigestOp, TermUpdate},
    Class, TermStore,
};
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> TermStore {
    TermStore::open(
        dir.path().join("words.db"),
        false,
        128,
        Duration::from_secs(5),
    )
    .unwrap()
}

fn terms(names: &[&str]) -> Vec<Term> {
    names
        .iter()
        .map(|name| Term::from_raw(format!("body/{name}")).unwrap())
        .collect()
}

const DIGEST: [u8; 16] = [7; 16];

#[test]
fn apply_and_get_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let batch = terms(&["alpha", "beta"]);

    store
        .apply(
            &[TermUpdate {
                terms: &batch,
                class: Class::Spam,
                delta: 1,
            }],
            Some((&DIGEST, DigestOp::Insert(Class::Spam))),
            100,
        )
        .unwrap();

    let record = store.get("body/alpha").unwrap().unwrap();
    assert_eq!((record.counts.good, record.counts.spam), (0, 1));
    assert_eq!(record.last_seen, 100);
    assert_eq!(store.corpus().unwrap().spam, 1);
    assert_eq!(store.contains_digest(&DIGEST).unwrap(), Some(Class::Spam));
}

#[test]
fn decrements_clamp_at_zero() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let batch = terms(&["alpha"]);

    store
        .apply(
            &[TermUpdate {
                terms: &batch,
                class: Class::Good,
                delta: -1,
            }],
            None,
            100,
        )
        .unwrap();

    let record = store.get("body/alpha").unwrap().unwrap();
    assert_eq!((record.counts.good, record.counts.spam), (0, 0));
    assert_eq!(store.corpus().unwrap().good, 0);
}

#[test]
fn reclassification_commits_as_one_batch() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let batch = terms(&["alpha", "beta", "gamma"]);

    store
        .apply(
            &[TermUpdate {
                terms: &batch,
                class: Class::Good,
                delta: 1,
            }],
            Some((&DIGEST, DigestOp::Insert(Class::Good))),
            100,
        )
        .unwrap();
    store
        .apply(
            &[
                TermUpdate {
                    terms: &batch,
                    class: Class::Good,
                    delta: -1,
                },
                TermUpdate {
                    terms: &batch,
                    class: Class::Spam,
                    delta: 1,
                },
            ],
            Some((&DIGEST, DigestOp::Insert(Class::Spam))),
            101,
        )
        .unwrap();

    for name in ["body/alpha", "body/beta", "body/gamma"] {
        let record = store.get(name).unwrap().unwrap();
        assert_eq!((record.counts.good, record.counts.spam), (0, 1));
    }
    let corpus = store.corpus().unwrap();
    assert_eq!((corpus.good, corpus.spam), (0, 1));
    assert_eq!(store.contains_digest(&DIGEST).unwrap(), Some(Class::Spam));
}

#[test]
fn maintenance_only_expires_weak_terms() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let strong = terms(&["strong"]);
    for _ in 0..5 {
        store
            .apply(
                &[TermUpdate {
                    terms: &strong,
                    class: Class::Spam,
                    delta: 1,
                }],
                None,
                100,
            )
            .unwrap();
    }
    let weak = terms(&["weak"]);
    store
        .apply(
            &[TermUpdate {
                terms: &weak,
                class: Class::Good,
                delta: 1,
            }],
            None,
            100,
        )
        .unwrap();

    // eight days later with a seven-day window: the singleton expires
    let report = store.maintenance(108, 7).unwrap();
    assert_eq!(report.terms_removed, 1);
    assert!(store.get("body/weak").unwrap().is_none());
    assert!(store.get("body/strong").unwrap().is_some());

    // within the window nothing expires
    let fresh_weak = terms(&["fresh"]);
    store
        .apply(
            &[TermUpdate {
                terms: &fresh_weak,
                class: Class::Good,
                delta: 1,
            }],
            None,
            108,
        )
        .unwrap();
    let report = store.maintenance(109, 7).unwrap();
    assert_eq!(report.terms_removed, 0);
}

#[test]
fn export_import_is_byte_exact() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    // a term with every escapable character
    let tricky = vec![
        Term::from_raw("body/tab\there".to_string()).unwrap(),
        Term::from_raw("body/back\\slash".to_string()).unwrap(),
        Term::from_raw("body/plain").unwrap(),
    ];
    store
        .apply(
            &[TermUpdate {
                terms: &tricky,
                class: Class::Spam,
                delta: 1,
            }],
            Some((&DIGEST, DigestOp::Insert(Class::Spam))),
            42,
        )
        .unwrap();

    let mut dump = Vec::new();
    store.export(&mut dump).unwrap();

    let dir2 = TempDir::new().unwrap();
    let copy = open_store(&dir2);
    let report = copy.import(std::io::Cursor::new(&dump)).unwrap();
    assert_eq!(report.terms, 3);
    assert_eq!(report.digests, 1);

    let mut dump2 = Vec::new();
    copy.export(&mut dump2).unwrap();
    assert_eq!(dump, dump2);
}

#[test]
fn import_rejects_garbage_without_changes() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    assert!(store
        .import(std::io::Cursor::new(b"not a dump at all\n"))
        .is_err());
    assert!(store
        .import(std::io::Cursor::new(
            b"#mailprobe-export v1\n#good 1\n#spam 1\ntruncated",
        ))
        .is_err());
    assert_eq!(store.term_count().unwrap(), 0);
    assert_eq!(store.corpus().unwrap().good, 0);
}

#[test]
fn backup_and_restore_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let batch = terms(&["kept"]);
    store
        .apply(
            &[TermUpdate {
                terms: &batch,
                class: Class::Spam,
                delta: 1,
            }],
            None,
            10,
        )
        .unwrap();

    let backup = dir.path().join("backup.db");
    store.backup(&backup).unwrap();
    drop(store);

    let restored_dir = TempDir::new().unwrap();
    let db_path = restored_dir.path().join("words.db");
    TermStore::restore(&backup, &db_path).unwrap();
    let restored = TermStore::open(&db_path, false, 128, Duration::from_secs(5)).unwrap();
    let record = restored.get("body/kept").unwrap().unwrap();
    assert_eq!(record.counts.spam, 1);
}

// Terms always written together must always read together; a torn
// snapshot would show them apart.
#[test]
fn readers_never_observe_torn_batches() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let pair = terms(&["twin-a", "twin-b"]);

    let writer = {
        let store = store.clone();
        let pair = pair.clone();
        std::thread::spawn(move || {
            for round in 0..200 {
                store
                    .apply(
                        &[TermUpdate {
                            terms: &pair,
                            class: Class::Spam,
                            delta: 1,
                        }],
                        None,
                        round,
                    )
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let pair = pair.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let records = store.get_many(&pair).unwrap();
                    let a = records[0].map(|r| r.counts.spam).unwrap_or(0);
                    let b = records[1].map(|r| r.counts.spam).unwrap_or(0);
                    assert_eq!(a, b, "torn read: twin-a={a} twin-b={b}");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
