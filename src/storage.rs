use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LoadError, MatchError};
use crate::fingerprint::{distance, Fingerprint};
use crate::rank::{rank, MatchResult, ResultCount};

/// One reference thumbnail and its fingerprint.
///
/// On the wire this is `{"filename": "...", "phash": "..."}`. The fingerprint
/// goes through [`exact_u64`] so that values above 2^53 survive the trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(rename = "filename", alias = "identifier")]
    pub identifier: String,
    #[serde(rename = "phash", alias = "fingerprint", with = "exact_u64")]
    pub fingerprint: Fingerprint,
}

impl ReferenceEntry {
    pub fn new(identifier: impl Into<String>, fingerprint: impl Into<Fingerprint>) -> Self {
        Self {
            identifier: identifier.into(),
            fingerprint: fingerprint.into(),
        }
    }
}

/// Ordered, read-only set of reference fingerprints.
///
/// Built once, then shared by reference with every ranking call. Order is the
/// document order and only matters for breaking ties.
#[derive(Clone, Debug, Default)]
pub struct ReferenceDatabase {
    entries: Vec<ReferenceEntry>,
    path: Option<PathBuf>,
}

impl ReferenceDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a database from entries, rejecting duplicate identifiers.
    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Result<Self, LoadError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.identifier.as_str()) {
                return Err(LoadError::DuplicateIdentifier(entry.identifier.clone()));
            }
        }
        Ok(Self {
            entries,
            path: None,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| LoadError::unreachable(path, e))?;
        let mut db = Self::from_reader(BufReader::new(file))?;
        db.path = Some(path.to_path_buf());
        debug!(entries = db.len(), path = %path.display(), "loaded reference database");
        Ok(db)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let entries: Vec<ReferenceEntry> = serde_json::from_reader(reader)?;
        Self::from_entries(entries)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, LoadError> {
        let entries: Vec<ReferenceEntry> = serde_json::from_slice(bytes)?;
        Self::from_entries(entries)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<&Self, LoadError> {
        serde_json::to_writer(writer, &self.entries).map_err(LoadError::Write)?;
        Ok(self)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<&Self, LoadError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| LoadError::unreachable(path, e))?;
        let mut writer = BufWriter::new(file);
        self.to_writer(&mut writer)?;
        writer
            .flush()
            .map_err(|e| LoadError::unreachable(path, e))?;
        debug!(entries = self.len(), path = %path.display(), "wrote reference database");
        Ok(self)
    }

    /// Writes back to the file this database was loaded from.
    pub fn save(&self) -> Result<&Self, LoadError> {
        match &self.path {
            Some(p) => self.to_file(p),
            None => Err(LoadError::unreachable(
                PathBuf::new(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "No path set"),
            )),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn push(
        &mut self,
        identifier: impl Into<String>,
        fingerprint: impl Into<Fingerprint>,
    ) -> Result<(), LoadError> {
        let entry = ReferenceEntry::new(identifier, fingerprint);
        if self.get(&entry.identifier).is_some() {
            return Err(LoadError::DuplicateIdentifier(entry.identifier));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn sort_by_identifier(&mut self) {
        self.entries
            .sort_by(|a, b| a.identifier.cmp(&b.identifier));
    }

    pub fn get(&self, identifier: &str) -> Option<&ReferenceEntry> {
        self.entries.iter().find(|e| e.identifier == identifier)
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReferenceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifier of the first reference with exactly this fingerprint.
    pub fn find(&self, query: Fingerprint) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| distance(e.fingerprint, query) == 0)
            .map(|e| e.identifier.as_str())
    }

    /// Top `size` matches for `query`, best first.
    ///
    /// A negative `size` is rejected with [`MatchError::InvalidArgument`].
    pub fn find_many(&self, query: Fingerprint, size: i64) -> Result<Vec<MatchResult>, MatchError> {
        let count = ResultCount::try_from(size)?;
        Ok(rank(query, self, count.get()))
    }
}

impl FromStr for ReferenceDatabase {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(s.as_bytes())
    }
}

impl<'a> IntoIterator for &'a ReferenceDatabase {
    type Item = &'a ReferenceEntry;
    type IntoIter = std::slice::Iter<'a, ReferenceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Decode hook for the fingerprint field.
///
/// Accepts a JSON integer that fits in `u64`, or a decimal / `0x` hex string.
/// Floats, negatives and anything wider than 64 bits are errors, never rounded.
/// Always writes a decimal string.
pub mod exact_u64 {
    use std::fmt;

    use serde::de::{self, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};

    use crate::fingerprint::Fingerprint;

    pub fn serialize<S: Serializer>(fp: &Fingerprint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&fp.bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fingerprint, D::Error> {
        deserializer.deserialize_any(FingerprintVisitor)
    }

    struct FingerprintVisitor;

    impl<'de> Visitor<'de> for FingerprintVisitor {
        type Value = Fingerprint;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a 64-bit unsigned integer or an integer string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Fingerprint, E> {
            Ok(Fingerprint(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Fingerprint, E> {
            u64::try_from(v)
                .map(Fingerprint)
                .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Fingerprint, E> {
            Err(E::invalid_type(Unexpected::Float(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Fingerprint, E> {
            v.parse()
                .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
        }
    }
}
