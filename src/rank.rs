use serde::Serialize;
use tracing::debug;

use crate::error::MatchError;
use crate::fingerprint::{confidence, distance, Fingerprint};
use crate::storage::ReferenceDatabase;

/// A single ranked candidate.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchResult {
    pub identifier: String,
    /// In `[0.0, 1.0]`; 1.0 means the fingerprints are identical.
    pub confidence: f64,
    pub distance: u32,
}

/// Ranked candidates for one query thumbnail.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchSet<S> {
    pub source: S,
    pub matches: Vec<MatchResult>,
}

impl<S> MatchSet<S> {
    pub fn best(&self) -> Option<&MatchResult> {
        self.matches.first()
    }

    pub fn others(&self) -> &[MatchResult] {
        self.matches.get(1..).unwrap_or_default()
    }
}

/// A validated, non-negative number of results.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResultCount(usize);

impl ResultCount {
    pub fn get(self) -> usize {
        self.0
    }
}

impl From<usize> for ResultCount {
    fn from(n: usize) -> Self {
        Self(n)
    }
}

impl TryFrom<i64> for ResultCount {
    type Error = MatchError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        usize::try_from(n).map(Self).map_err(|_| {
            MatchError::InvalidArgument(format!("result count must not be negative, got {}", n))
        })
    }
}

/// Ranks every reference against `query` and keeps the best `n`.
///
/// Ordered by confidence descending. References with equal confidence keep
/// the order they have in `references`.
pub fn rank(query: Fingerprint, references: &ReferenceDatabase, n: usize) -> Vec<MatchResult> {
    if n == 0 || references.is_empty() {
        return vec![];
    }

    let mut scored: Vec<(u32, &str)> = references
        .iter()
        .map(|entry| (distance(query, entry.fingerprint), entry.identifier.as_str()))
        .collect();

    // Lower distance is higher confidence. sort_by_key is stable.
    scored.sort_by_key(|&(dist, _)| dist);
    scored.truncate(n);

    debug!(
        query = %query,
        references = references.len(),
        returned = scored.len(),
        best_distance = scored.first().map(|&(d, _)| d),
        "ranked query"
    );

    scored
        .into_iter()
        .map(|(dist, identifier)| MatchResult {
            identifier: identifier.to_string(),
            confidence: confidence(dist),
            distance: dist,
        })
        .collect()
}

/// Ranks each `(source, fingerprint)` pair, one [`MatchSet`] per query, in input order.
pub fn match_all<S, I>(queries: I, references: &ReferenceDatabase, n: usize) -> Vec<MatchSet<S>>
where
    I: IntoIterator<Item = (S, Fingerprint)>,
{
    queries
        .into_iter()
        .map(|(source, fp)| MatchSet {
            source,
            matches: rank(fp, references, n),
        })
        .collect()
}

/// Static display location for a reference: `prefix` followed by the identifier.
pub fn display_path(prefix: &str, identifier: &str) -> String {
    format!("{}{}", prefix, identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ReferenceEntry;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn db(entries: &[(&str, u64)]) -> ReferenceDatabase {
        ReferenceDatabase::from_entries(
            entries
                .iter()
                .map(|&(id, fp)| ReferenceEntry::new(id, fp))
                .collect(),
        )
        .unwrap()
    }

    fn random_db(rng: &mut StdRng, size: usize) -> ReferenceDatabase {
        ReferenceDatabase::from_entries(
            (0..size)
                .map(|i| ReferenceEntry::new(format!("ref-{}", i), rng.random::<u64>()))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_all_ones_and_zero() {
        let refs = db(&[("a", u64::MAX), ("b", 0)]);

        let two = rank(Fingerprint(0), &refs, 2);
        assert_eq!(two.len(), 2);
        assert_eq!(two[0].identifier, "b");
        assert_eq!(two[0].confidence, 1.0);
        assert_eq!(two[1].identifier, "a");
        assert_eq!(two[1].confidence, 0.0);

        let one = rank(Fingerprint(0), &refs, 1);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].identifier, "b");
        assert_eq!(one[0].confidence, 1.0);
    }

    #[test]
    fn test_sixteen_differing_bits() {
        let refs = db(&[("x", 0x0000_FFFF_0000_0000)]);
        let results = rank(Fingerprint(0), &refs, 1);
        assert_eq!(results[0].distance, 16);
        assert_eq!(results[0].confidence, 0.75);
    }

    #[test]
    fn test_zero_count_and_empty_database() {
        let refs = db(&[("a", 1)]);
        assert!(rank(Fingerprint(1), &refs, 0).is_empty());
        assert!(rank(Fingerprint(1), &ReferenceDatabase::new(), 5).is_empty());
    }

    #[test]
    fn test_negative_count_is_invalid() {
        assert!(matches!(
            ResultCount::try_from(-3i64),
            Err(MatchError::InvalidArgument(_))
        ));
        assert_eq!(ResultCount::try_from(4i64).unwrap().get(), 4);
    }

    #[test]
    fn test_ties_keep_input_order() {
        // All three are one bit away from the query.
        let refs = db(&[("c", 0b001), ("a", 0b010), ("b", 0b100), ("far", u64::MAX)]);
        let ids: Vec<_> = rank(Fingerprint(0), &refs, 4)
            .into_iter()
            .map(|m| m.identifier)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b", "far"]);
    }

    #[test]
    fn test_self_match_first() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let refs = random_db(&mut rng, 32);
            let target = &refs.entries()[rng.random_range(0..refs.len())];
            let results = rank(target.fingerprint, &refs, 1);
            assert_eq!(results[0].confidence, 1.0);
            assert_eq!(results[0].identifier, target.identifier);
        }
    }

    #[test]
    fn test_random_properties() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            let size = rng.random_range(0..40);
            let refs = random_db(&mut rng, size);
            let n = rng.random_range(0..50);
            let query = Fingerprint(rng.random());
            let results = rank(query, &refs, n);

            assert_eq!(results.len(), n.min(refs.len()));
            for pair in results.windows(2) {
                assert!(pair[0].confidence >= pair[1].confidence);
            }
            for m in &results {
                assert!((0.0..=1.0).contains(&m.confidence));
            }
        }
    }

    #[test]
    fn test_stable_against_input_order_with_many_ties() {
        let mut rng = StdRng::seed_from_u64(7);
        // Low-entropy fingerprints force lots of equal distances.
        let refs = ReferenceDatabase::from_entries(
            (0..64)
                .map(|i| ReferenceEntry::new(format!("{:02}", i), rng.random::<u64>() & 0b111))
                .collect(),
        )
        .unwrap();
        let results = rank(Fingerprint(0), &refs, refs.len());
        let position = |id: &str| refs.iter().position(|e| e.identifier == id).unwrap();
        for pair in results.windows(2) {
            if pair[0].confidence == pair[1].confidence {
                assert!(position(&pair[0].identifier) < position(&pair[1].identifier));
            }
        }
    }

    #[test]
    fn test_match_all_pairs_sources() {
        let refs = db(&[("a", u64::MAX), ("b", 0)]);
        let sets = match_all(vec![("first", Fingerprint(0)), ("second", Fingerprint(u64::MAX))], &refs, 1);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].source, "first");
        assert_eq!(sets[0].best().unwrap().identifier, "b");
        assert_eq!(sets[1].best().unwrap().identifier, "a");
        assert!(sets[1].others().is_empty());
    }

    #[test]
    fn test_display_path() {
        assert_eq!(display_path("thumbnails/", "res001.png"), "thumbnails/res001.png");
    }
}
