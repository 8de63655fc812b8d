use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of bits in every fingerprint.
pub const FINGERPRINT_BITS: u32 = u64::BITS;

/// A 64-bit perceptual fingerprint of a thumbnail.
///
/// The width is fixed by the type, so two fingerprints are always comparable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Number of differing bit positions between two fingerprints.
    pub fn distance(self, other: Fingerprint) -> u32 {
        distance(self, other)
    }
}

impl From<u64> for Fingerprint {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl From<Fingerprint> for u64 {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/**
 * Parses a fingerprint from a decimal or `0x`-prefixed hexadecimal literal.
 * Values that do not fit in 64 bits are rejected rather than truncated.
 */
impl FromStr for Fingerprint {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bits = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16)?,
            None => s.parse::<u64>()?,
        };
        Ok(Self(bits))
    }
}

/// Hamming distance: `popcount(a XOR b)`, in `0..=64`.
pub fn distance(first: Fingerprint, second: Fingerprint) -> u32 {
    (first.0 ^ second.0).count_ones()
}

/// Population count without the hardware intrinsic.
/// Clears the lowest set bit until none are left.
pub fn popcount_portable(mut value: u64) -> u32 {
    let mut count = 0;
    while value != 0 {
        value &= value - 1;
        count += 1;
    }
    count
}

/// Maps a bit distance onto `[0.0, 1.0]`, 1.0 meaning identical fingerprints.
pub fn confidence(distance: u32) -> f64 {
    let distance = distance.min(FINGERPRINT_BITS);
    1.0 - f64::from(distance) / f64::from(FINGERPRINT_BITS)
}

/**
 * Compares two fingerprints and returns a float between 0.0 and 1.0 that describes their similarity, 1.0 being the most similar.
 */
pub fn compare_prints(first: Fingerprint, second: Fingerprint) -> f64 {
    confidence(distance(first, second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_distance_known_values() {
        assert_eq!(distance(Fingerprint(0), Fingerprint(0)), 0);
        assert_eq!(distance(Fingerprint(0b1001), Fingerprint(0b1000)), 1);
        assert_eq!(distance(Fingerprint(0b0111), Fingerprint(0b1000)), 4);
        assert_eq!(distance(Fingerprint(0), Fingerprint(u64::MAX)), 64);
    }

    #[test]
    fn test_popcount_matches_intrinsic() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..10_000 {
            let v: u64 = rng.random();
            assert_eq!(popcount_portable(v), v.count_ones(), "value {:#x}", v);
        }
        for v in [0, 1, u64::MAX, u64::MAX - 1, 1 << 63] {
            assert_eq!(popcount_portable(v), v.count_ones());
        }
    }

    #[test]
    fn test_confidence_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let a = Fingerprint(rng.random());
            let b = Fingerprint(rng.random());
            let c = compare_prints(a, b);
            assert!((0.0..=1.0).contains(&c));
            assert_eq!(c == 0.0, a.0 ^ b.0 == u64::MAX);
        }
        assert_eq!(compare_prints(Fingerprint(0), Fingerprint(u64::MAX)), 0.0);
    }

    #[test]
    fn test_sixteen_bits_is_three_quarters() {
        let query = Fingerprint(0);
        let reference = Fingerprint(0xFFFF_0000_0000_0000);
        assert_eq!(compare_prints(query, reference), 0.75);
    }

    #[test]
    fn test_parse_fingerprint() {
        assert_eq!("0".parse::<Fingerprint>().unwrap(), Fingerprint(0));
        assert_eq!(
            "18446744073709551615".parse::<Fingerprint>().unwrap(),
            Fingerprint(u64::MAX)
        );
        assert_eq!("0xff".parse::<Fingerprint>().unwrap(), Fingerprint(255));
        assert!("18446744073709551616".parse::<Fingerprint>().is_err());
        assert!("-1".parse::<Fingerprint>().is_err());
        assert!("1.5".parse::<Fingerprint>().is_err());
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(Fingerprint(0xab).to_string(), "0x00000000000000ab");
        let fp = Fingerprint(0xdead_beef_0000_0001);
        assert_eq!(fp.to_string().parse::<Fingerprint>().unwrap(), fp);
    }
}
