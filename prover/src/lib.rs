// ZK Hold'em prover library
// Card commitments, the seeded shuffle, hand evaluation and the Groth16
// (BN254) circuits behind the dealing proofs

pub mod cards;
pub mod circuits;
pub mod commitment;
pub mod evaluator;
pub mod field;
pub mod layout;
pub mod oracle;
pub mod poseidon;
pub mod proof_generator;
pub mod seat;
pub mod seed;
pub mod shuffle;
pub mod witness_generator;

pub use cards::{Card, CardError, DECK_SIZE};
pub use commitment::{CardCommitment, CardOpening};
pub use evaluator::{evaluate, EvaluationError, HandCategory, HandRank};
pub use layout::{Seat, Street};
pub use oracle::{
    CircuitId, MockOracle, NativeOracle, PrivateInputs, ProofBytes, ProofError, ProofOracle,
    PublicInputs,
};
pub use proof_generator::{CircuitShape, Groth16Oracle};
pub use seat::SeatClient;
pub use seed::{DeckSeed, RevealedSeeds, Seed, SeedCommitment};
pub use shuffle::ShuffledDeck;

// Re-export core types for convenience
pub use ark_bn254::{Bn254, Fr};
