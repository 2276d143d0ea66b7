//! Player-side client: owns the seat's seed and hole-card openings and turns
//! them into commitments and proofs for submission.

use crate::cards::Card;
use crate::commitment::{CardCommitment, CardOpening};
use crate::evaluator::{self, EvaluationError, HandRank};
use crate::layout::{Seat, Street, BOARD_CARDS, HOLE_CARDS};
use crate::oracle::{CircuitId, PrivateInputs, ProofBytes, ProofError, ProofOracle, PublicInputs};
use crate::seed::{DeckSeed, Seed, SeedCommitment};
use rand::{CryptoRng, RngCore};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeatError {
    #[error("Hole cards have not been dealt to this seat")]
    NoHoleCards,
    #[error("Proof failed: {0}")]
    Proof(#[from] ProofError),
    #[error("Hand evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
}

#[derive(Clone, Debug)]
pub struct HoleCardSubmission {
    pub commitments: [CardCommitment; HOLE_CARDS],
    pub proof: ProofBytes,
}

#[derive(Clone, Debug)]
pub struct BoardSubmission {
    pub street: Street,
    pub cards: Vec<Card>,
    pub proof: ProofBytes,
}

#[derive(Clone, Debug)]
pub struct HandSubmission {
    pub rank: HandRank,
    pub score: u64,
    pub proof: ProofBytes,
}

pub struct SeatClient {
    seat: Seat,
    seed: Seed,
    hole: Option<[CardOpening; HOLE_CARDS]>,
}

impl SeatClient {
    pub fn new<R: RngCore + CryptoRng>(seat: Seat, rng: &mut R) -> Self {
        Self::with_seed(seat, Seed::random(rng))
    }

    pub fn with_seed(seat: Seat, seed: Seed) -> Self {
        Self {
            seat,
            seed,
            hole: None,
        }
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn seed_commitment(&self) -> SeedCommitment {
        self.seed.commitment()
    }

    pub fn reveal_seed(&self) -> Seed {
        self.seed
    }

    pub fn hole_commitments(&self) -> Option<[CardCommitment; HOLE_CARDS]> {
        self.hole.map(|openings| openings.map(|o| o.commitment()))
    }

    pub fn hole_cards(&self) -> Option<[Card; HOLE_CARDS]> {
        self.hole.map(|openings| openings.map(|o| o.card))
    }

    /// Recompute the deck locally and take this seat's cards with fresh salts.
    pub fn deal<R: RngCore + CryptoRng>(
        &mut self,
        deck_seed: &DeckSeed,
        rng: &mut R,
    ) -> [CardCommitment; HOLE_CARDS] {
        let openings = deck_seed
            .shuffle()
            .hole_cards(self.seat)
            .map(|card| CardOpening::random(card, rng));
        self.hole = Some(openings);
        openings.map(|o| o.commitment())
    }

    pub fn prove_hole_cards(
        &self,
        oracle: &dyn ProofOracle,
        deck_seed: &DeckSeed,
    ) -> Result<HoleCardSubmission, SeatError> {
        let openings = self.hole.ok_or(SeatError::NoHoleCards)?;
        let commitments = openings.map(|o| o.commitment());
        let public = PublicInputs::HoleCards {
            deck_seed: *deck_seed,
            seat: self.seat,
            commitments,
        };
        let proof = oracle.prove(
            CircuitId::HoleCards,
            &PrivateInputs::HoleCards { openings },
            &public,
        )?;
        Ok(HoleCardSubmission { commitments, proof })
    }

    /// Board reveals need no secrets; any participant can produce them.
    pub fn prove_board(
        oracle: &dyn ProofOracle,
        deck_seed: &DeckSeed,
        street: Street,
    ) -> Result<BoardSubmission, SeatError> {
        let cards = deck_seed.shuffle().street_cards(street);
        let public = PublicInputs::CommunityReveal {
            deck_seed: *deck_seed,
            street,
            cards: cards.clone(),
        };
        let proof = oracle.prove(
            CircuitId::CommunityReveal,
            &PrivateInputs::CommunityReveal,
            &public,
        )?;
        Ok(BoardSubmission {
            street,
            cards,
            proof,
        })
    }

    pub fn prove_hand(
        &self,
        oracle: &dyn ProofOracle,
        board: &[Card; BOARD_CARDS],
    ) -> Result<HandSubmission, SeatError> {
        let openings = self.hole.ok_or(SeatError::NoHoleCards)?;
        let rank = evaluator::evaluate_hand(&openings.map(|o| o.card), board)?;
        let score = rank.score();
        let public = PublicInputs::HandReveal {
            commitments: openings.map(|o| o.commitment()),
            board: *board,
            score,
        };
        let proof = oracle.prove(
            CircuitId::HandReveal,
            &PrivateInputs::HandReveal { openings },
            &public,
        )?;
        Ok(HandSubmission { rank, score, proof })
    }
}
