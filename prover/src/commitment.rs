//! Hiding, binding card commitments: `C = Poseidon(card, salt)`.

use crate::cards::{Card, CardError};
use crate::field;
use crate::poseidon;
use ark_bn254::Fr;
use ark_std::UniformRand;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardCommitment(#[serde(with = "field::serde_hex")] pub Fr);

impl CardCommitment {
    pub fn as_field(&self) -> Fr {
        self.0
    }
}

pub fn commit(card: Card, salt: Fr) -> CardCommitment {
    CardCommitment(poseidon::hash(&[card.to_field(), salt]))
}

/// Commit to a raw card value, rejecting values outside the deck.
pub fn commit_value(value: u64, salt: Fr) -> Result<CardCommitment, CardError> {
    Ok(commit(Card::from_u64(value)?, salt))
}

pub fn verify(card: Card, salt: Fr, commitment: &CardCommitment) -> bool {
    commit(card, salt) == *commitment
}

/// Values outside the deck never open a commitment.
pub fn verify_value(value: u64, salt: Fr, commitment: &CardCommitment) -> bool {
    Card::from_u64(value)
        .map(|card| verify(card, salt, commitment))
        .unwrap_or(false)
}

pub fn random_salt<R: Rng>(rng: &mut R) -> Fr {
    Fr::rand(rng)
}

/// A card together with the salt that opens its commitment. Never leaves
/// the owning seat except as a private proof input.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CardOpening {
    pub card: Card,
    pub salt: Fr,
}

impl CardOpening {
    pub fn new(card: Card, salt: Fr) -> Self {
        Self { card, salt }
    }

    pub fn random<R: Rng>(card: Card, rng: &mut R) -> Self {
        Self::new(card, random_salt(rng))
    }

    pub fn commitment(&self) -> CardCommitment {
        commit(self.card, self.salt)
    }

    pub fn opens(&self, commitment: &CardCommitment) -> bool {
        verify(self.card, self.salt, commitment)
    }
}

impl std::fmt::Debug for CardOpening {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardOpening")
            .field("card", &self.card)
            .field("salt", &"<redacted>")
            .finish()
    }
}
