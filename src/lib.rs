//! Matches card thumbnails against a database of reference fingerprints.
//!
//! Load a [`ReferenceDatabase`] once, then [`rank`] each query fingerprint
//! against it. Ranking only reads the database, so one loaded copy can be
//! shared across threads.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod hasher;
pub mod linalg;
pub mod rank;
pub mod storage;

pub use config::MatcherConfig;
pub use error::{ConfigError, LoadError, MatchError};
pub use fingerprint::{compare_prints, confidence, distance, Fingerprint};
pub use hasher::{dhash, phash, HashAlgorithm};
pub use rank::{display_path, match_all, rank, MatchResult, MatchSet, ResultCount};
pub use storage::{ReferenceDatabase, ReferenceEntry};

#[test]
fn distance_test() {
    assert_eq!(
        35,
        distance(
            Fingerprint(0b0000001100000011000000110010001100000011000110110010101100101111),
            Fingerprint(0b0011000000110000001100000010000011110001101100000011000011110000)
        )
    );
    assert_eq!(1, distance(Fingerprint(0b1001), Fingerprint(0b1000)));
    assert_eq!(4, distance(Fingerprint(0b0111), Fingerprint(0b1000)));
}

#[test]
fn fixture_load_and_rank() {
    let db = ReferenceDatabase::from_file("./test/character_hashes.json").unwrap();
    assert_eq!(db.len(), 4);
    assert_eq!(
        db.get("res009_no021_normal.png").unwrap().fingerprint,
        Fingerprint(u64::MAX)
    );

    let results = rank(Fingerprint(0), &db, 2);
    assert_eq!(results[0].identifier, "res001_no001_normal.png");
    assert_eq!(results[0].confidence, 1.0);
}

#[test]
fn hashstore_read_write() {
    let dir = tempfile::tempdir().unwrap();
    let fname = dir.path().join("data.json");

    let mut store = ReferenceDatabase::new();
    store.push("./test/pokemon/nonexistant.png", 0b1001u64).unwrap();
    store.to_file(&fname).unwrap();

    let store_fs = ReferenceDatabase::from_file(&fname).unwrap_or_default();
    assert_eq!(
        store_fs.find(Fingerprint(0b1001)).unwrap(),
        "./test/pokemon/nonexistant.png"
    );
    assert_eq!(store_fs.path(), Some(fname.as_path()));
    store_fs.save().unwrap();
}
