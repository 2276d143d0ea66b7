//! Proof backends as seen by the sequencer.

use clap::ValueEnum;
use prover::{Groth16Oracle, NativeOracle, ProofError, ProofOracle};
use std::sync::Arc;
use tracing::{info, warn};

/// Which verifier the service runs with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ProofBackend {
    /// Zero-knowledge proofs for every circuit.
    #[default]
    Groth16,
    /// Proof bytes carry the hole cards and salts in the clear. Development
    /// only: the sequencer sees every seat's cards.
    InsecureDisclosure,
}

/// Build the verifier the service runs with.
///
/// Groth16 keys for every circuit shape are generated up front, so this is
/// slow and belongs on a blocking thread.
pub fn build_oracle(backend: ProofBackend) -> Result<Arc<dyn ProofOracle>, ProofError> {
    match backend {
        ProofBackend::Groth16 => {
            let mut groth16 = Groth16Oracle::new();
            groth16.setup()?;
            info!("Groth16 keys ready");
            Ok(Arc::new(groth16))
        }
        ProofBackend::InsecureDisclosure => {
            warn!("Using disclosure proofs: hole cards are visible to the sequencer");
            Ok(Arc::new(NativeOracle::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prover::{CircuitId, DeckSeed, PrivateInputs, PublicInputs, Street};

    #[test]
    fn test_zero_knowledge_is_the_default() {
        assert_eq!(ProofBackend::default(), ProofBackend::Groth16);
        assert_eq!(
            ProofBackend::from_str("insecure-disclosure", true),
            Ok(ProofBackend::InsecureDisclosure)
        );
        assert!(ProofBackend::from_str("native", true).is_err());
    }

    #[test]
    fn test_disclosure_backend_must_be_requested() {
        let oracle = build_oracle(ProofBackend::InsecureDisclosure).unwrap();
        let deck_seed = DeckSeed::from_bytes([5u8; 32]);
        let public = PublicInputs::CommunityReveal {
            deck_seed,
            street: Street::Turn,
            cards: deck_seed.shuffle().street_cards(Street::Turn),
        };
        let proof = oracle
            .prove(CircuitId::CommunityReveal, &PrivateInputs::CommunityReveal, &public)
            .unwrap();
        assert!(oracle
            .verify(CircuitId::CommunityReveal, &proof, &public)
            .unwrap());
    }
}
