//! Proof oracle boundary.
//!
//! The hand state machine only ever sees [`ProofOracle::verify`]'s verdict.
//! Backends:
//! - [`crate::proof_generator::Groth16Oracle`]: zero-knowledge Groth16 proofs
//!   for hole-card commitments, board reveals and hand reveals.
//! - [`NativeOracle`]: disclosure proofs. The proof bytes carry the private
//!   inputs (hole cards and salts) and the verifier recomputes the relation.
//!   Sound, but not hiding: whoever verifies learns every seat's cards. Only
//!   for tests and explicitly insecure development setups.
//! - [`MockOracle`]: fixed verdict for tests.

use crate::cards::{Card, CardError};
use crate::commitment::{CardCommitment, CardOpening};
use crate::field;
use crate::layout::{Seat, Street, BOARD_CARDS, HOLE_CARDS};
use crate::seed::DeckSeed;
use crate::witness_generator::{WitnessError, WitnessGenerator};
use ark_serialize::SerializationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Upper bound on any proof this system accepts.
pub const MAX_PROOF_BYTES: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitId {
    HoleCards,
    CommunityReveal,
    HandReveal,
}

/// Errors that can occur while proving or verifying
#[derive(Error, Debug)]
pub enum ProofError {
    #[error("Witness generation failed: {0}")]
    WitnessGeneration(#[from] WitnessError),
    #[error("Proof generation failed: {0}")]
    ProofGeneration(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),
    #[error("Malformed proof: {0}")]
    MalformedProof(String),
    #[error("Proof is {len} bytes, outside the accepted range 1..={max}")]
    InvalidProofSize { len: usize, max: usize },
    #[error("Proving keys for {0:?} are not set up")]
    NotSetUp(CircuitId),
    #[error("Circuit mismatch: expected {expected:?}, got {actual:?}")]
    CircuitMismatch {
        expected: CircuitId,
        actual: CircuitId,
    },
}

impl ProofError {
    /// True when the error is the submitted proof's fault rather than the
    /// backend's, so the submission counts as rejected.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ProofError::Serialization(_)
                | ProofError::MalformedProof(_)
                | ProofError::InvalidProofSize { .. }
                | ProofError::CircuitMismatch { .. }
        )
    }
}

/// Statement a proof is checked against. Everything here is public.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "circuit", rename_all = "snake_case")]
pub enum PublicInputs {
    HoleCards {
        deck_seed: DeckSeed,
        seat: Seat,
        commitments: [CardCommitment; HOLE_CARDS],
    },
    CommunityReveal {
        deck_seed: DeckSeed,
        street: Street,
        cards: Vec<Card>,
    },
    HandReveal {
        commitments: [CardCommitment; HOLE_CARDS],
        board: [Card; BOARD_CARDS],
        score: u64,
    },
}

impl PublicInputs {
    pub fn circuit_id(&self) -> CircuitId {
        match self {
            PublicInputs::HoleCards { .. } => CircuitId::HoleCards,
            PublicInputs::CommunityReveal { .. } => CircuitId::CommunityReveal,
            PublicInputs::HandReveal { .. } => CircuitId::HandReveal,
        }
    }
}

/// Prover-side secrets. Never serialized except by a disclosure backend.
#[derive(Clone, Debug)]
pub enum PrivateInputs {
    HoleCards {
        openings: [CardOpening; HOLE_CARDS],
    },
    CommunityReveal,
    HandReveal {
        openings: [CardOpening; HOLE_CARDS],
    },
}

/// Opaque proof bytes, hex encoded on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofBytes(pub Vec<u8>);

impl ProofBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn check_size(&self) -> Result<(), ProofError> {
        if self.is_empty() || self.len() > MAX_PROOF_BYTES {
            return Err(ProofError::InvalidProofSize {
                len: self.len(),
                max: MAX_PROOF_BYTES,
            });
        }
        Ok(())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, ProofError> {
        hex::decode(s.trim_start_matches("0x"))
            .map(Self)
            .map_err(|e| ProofError::MalformedProof(e.to_string()))
    }
}

impl Serialize for ProofBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ProofBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

pub trait ProofOracle: Send + Sync {
    fn prove(
        &self,
        circuit: CircuitId,
        private: &PrivateInputs,
        public: &PublicInputs,
    ) -> Result<ProofBytes, ProofError>;

    fn verify(
        &self,
        circuit: CircuitId,
        proof: &ProofBytes,
        public: &PublicInputs,
    ) -> Result<bool, ProofError>;
}

pub(crate) fn ensure_circuit(expected: CircuitId, public: &PublicInputs) -> Result<(), ProofError> {
    let actual = public.circuit_id();
    if expected != actual {
        return Err(ProofError::CircuitMismatch { expected, actual });
    }
    Ok(())
}

fn mismatched_private(circuit: CircuitId) -> ProofError {
    ProofError::ProofGeneration(format!("private inputs do not belong to {circuit:?}"))
}

/// Test double with a fixed verdict.
#[derive(Clone, Copy, Debug)]
pub struct MockOracle {
    accept: bool,
}

impl MockOracle {
    pub fn accepting() -> Self {
        Self { accept: true }
    }

    pub fn rejecting() -> Self {
        Self { accept: false }
    }
}

impl ProofOracle for MockOracle {
    fn prove(
        &self,
        circuit: CircuitId,
        _private: &PrivateInputs,
        public: &PublicInputs,
    ) -> Result<ProofBytes, ProofError> {
        ensure_circuit(circuit, public)?;
        Ok(ProofBytes(b"mock-proof".to_vec()))
    }

    fn verify(
        &self,
        circuit: CircuitId,
        proof: &ProofBytes,
        public: &PublicInputs,
    ) -> Result<bool, ProofError> {
        ensure_circuit(circuit, public)?;
        proof.check_size()?;
        Ok(self.accept)
    }
}

const OPENING_BYTES: usize = 1 + field::FIELD_BYTES;
const REVEAL_MARKER: &[u8] = b"recompute";

/// Disclosure backend: checks relations on plain values carried in the
/// proof bytes. Not zero-knowledge.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeOracle {
    witness_generator: WitnessGenerator,
}

impl NativeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn encode_openings(openings: &[CardOpening; HOLE_CARDS]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HOLE_CARDS * OPENING_BYTES);
        for opening in openings {
            buf.push(opening.card.index());
            buf.extend_from_slice(&field::to_bytes_be(&opening.salt));
        }
        buf
    }

    fn decode_openings(bytes: &[u8]) -> Result<[CardOpening; HOLE_CARDS], ProofError> {
        if bytes.len() != HOLE_CARDS * OPENING_BYTES {
            return Err(ProofError::MalformedProof(format!(
                "expected {} bytes of openings, got {}",
                HOLE_CARDS * OPENING_BYTES,
                bytes.len()
            )));
        }

        let malformed = |e: &dyn std::fmt::Display| ProofError::MalformedProof(e.to_string());
        let mut openings = Vec::with_capacity(HOLE_CARDS);
        for chunk in bytes.chunks(OPENING_BYTES) {
            let card = Card::new(chunk[0]).map_err(|e: CardError| malformed(&e))?;
            let salt = field::from_bytes_be(&chunk[1..]).map_err(|e| malformed(&e))?;
            openings.push(CardOpening::new(card, salt));
        }
        Ok([openings[0], openings[1]])
    }
}

impl ProofOracle for NativeOracle {
    fn prove(
        &self,
        circuit: CircuitId,
        private: &PrivateInputs,
        public: &PublicInputs,
    ) -> Result<ProofBytes, ProofError> {
        ensure_circuit(circuit, public)?;

        let bytes = match (public, private) {
            (
                PublicInputs::HoleCards {
                    deck_seed,
                    seat,
                    commitments,
                },
                PrivateInputs::HoleCards { openings },
            ) => {
                self.witness_generator
                    .hole_cards(deck_seed, *seat, openings, commitments)?;
                Self::encode_openings(openings)
            }
            (
                PublicInputs::CommunityReveal {
                    deck_seed,
                    street,
                    cards,
                },
                PrivateInputs::CommunityReveal,
            ) => {
                self.witness_generator
                    .community_reveal(deck_seed, *street, cards)?;
                REVEAL_MARKER.to_vec()
            }
            (
                PublicInputs::HandReveal {
                    commitments,
                    board,
                    score,
                },
                PrivateInputs::HandReveal { openings },
            ) => {
                self.witness_generator
                    .hand_reveal(commitments, board, *score, openings)?;
                Self::encode_openings(openings)
            }
            _ => return Err(mismatched_private(circuit)),
        };

        Ok(ProofBytes(bytes))
    }

    fn verify(
        &self,
        circuit: CircuitId,
        proof: &ProofBytes,
        public: &PublicInputs,
    ) -> Result<bool, ProofError> {
        ensure_circuit(circuit, public)?;
        proof.check_size()?;

        let verdict = match public {
            PublicInputs::HoleCards {
                deck_seed,
                seat,
                commitments,
            } => {
                let openings = Self::decode_openings(proof.as_slice())?;
                self.witness_generator
                    .hole_cards(deck_seed, *seat, &openings, commitments)
                    .is_ok()
            }
            PublicInputs::CommunityReveal {
                deck_seed,
                street,
                cards,
            } => {
                proof.as_slice() == REVEAL_MARKER
                    && self
                        .witness_generator
                        .community_reveal(deck_seed, *street, cards)
                        .is_ok()
            }
            PublicInputs::HandReveal {
                commitments,
                board,
                score,
            } => {
                let openings = Self::decode_openings(proof.as_slice())?;
                self.witness_generator
                    .hand_reveal(commitments, board, *score, &openings)
                    .is_ok()
            }
        };

        Ok(verdict)
    }
}
