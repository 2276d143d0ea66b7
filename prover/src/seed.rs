//! Per-seat secret seeds and the combined deck seed.
//!
//! Each seat publishes `keccak256(seed)` before anyone reveals. Once both
//! seeds are revealed and checked, the deck seed is
//! `keccak256(seed_0 || seed_1)` in seat order. A deck seed can only be
//! built from a [`RevealedSeeds`] pair, so there is no way to derive one
//! from a single seat's contribution.

use crate::field;
use crate::layout::NUM_SEATS;
use crate::shuffle::{self, ShuffledDeck};
use ark_bn254::Fr;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use thiserror::Error;

pub const SEED_BYTES: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("Seed material must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),
}

pub(crate) fn keccak(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn parse_hex32(s: &str) -> Result<[u8; 32], SeedError> {
    let bytes =
        hex::decode(s.trim_start_matches("0x")).map_err(|e| SeedError::InvalidHex(e.to_string()))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| SeedError::InvalidLength {
        expected: SEED_BYTES,
        actual: bytes.len(),
    })
}

macro_rules! hex_bytes_newtype {
    ($name:ident) => {
        impl $name {
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, SeedError> {
                parse_hex32(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A seat's secret 32-byte contribution to the deck entropy.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Seed([u8; 32]);

hex_bytes_newtype!(Seed);

impl Seed {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn commitment(&self) -> SeedCommitment {
        SeedCommitment(keccak(&[&self.0]))
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seed(<redacted>)")
    }
}

/// `keccak256(seed)`, published during the commit phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SeedCommitment([u8; 32]);

hex_bytes_newtype!(SeedCommitment);

impl SeedCommitment {
    pub fn matches(&self, seed: &Seed) -> bool {
        seed.commitment() == *self
    }
}

/// Both seats' seeds after each has been checked against its commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RevealedSeeds([Seed; NUM_SEATS]);

impl RevealedSeeds {
    pub fn new(seeds: [Seed; NUM_SEATS]) -> Self {
        Self(seeds)
    }

    pub fn deck_seed(&self) -> DeckSeed {
        DeckSeed(keccak(&[&self.0[0].0, &self.0[1].0]))
    }
}

/// Public per-hand shuffle seed. Anyone holding it can recompute the deck,
/// which is why it only exists after both seats have revealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeckSeed([u8; 32]);

hex_bytes_newtype!(DeckSeed);

impl DeckSeed {
    /// The seed as a field element, reduced modulo the field order.
    pub fn to_field(&self) -> Fr {
        field::reduce_bytes_be(&self.0)
    }

    pub fn shuffle(&self) -> ShuffledDeck {
        shuffle::shuffle(&self.to_field())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_commitment_matches_only_its_seed() {
        let mut rng = StdRng::seed_from_u64(11);
        let seed = Seed::random(&mut rng);
        let other = Seed::random(&mut rng);
        let commitment = seed.commitment();

        assert!(commitment.matches(&seed));
        assert!(!commitment.matches(&other));
    }

    #[test]
    fn test_deck_seed_depends_on_seat_order() {
        let a = Seed::from_bytes([1u8; 32]);
        let b = Seed::from_bytes([2u8; 32]);

        let ab = RevealedSeeds::new([a, b]).deck_seed();
        let ba = RevealedSeeds::new([b, a]).deck_seed();
        assert_ne!(ab, ba);
        assert_eq!(ab, RevealedSeeds::new([a, b]).deck_seed());
        assert_eq!(ab.as_bytes(), &keccak(&[&[1u8; 32], &[2u8; 32]]));
    }

    #[test]
    fn test_hex_round_trip_and_length_check() {
        let seed = Seed::from_bytes([0xab; 32]);
        assert_eq!(Seed::from_hex(&seed.to_hex()).unwrap(), seed);
        assert_eq!(
            Seed::from_hex("abcd"),
            Err(SeedError::InvalidLength {
                expected: 32,
                actual: 2
            })
        );
    }

    #[test]
    fn test_debug_does_not_leak_seed() {
        let seed = Seed::from_bytes([0x5a; 32]);
        assert!(!format!("{:?}", seed).contains("5a5a"));
    }
}
