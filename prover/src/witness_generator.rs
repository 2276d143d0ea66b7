use crate::cards::Card;
use crate::circuits::{HandRevealCircuit, HoleCardsCircuit, RevealCircuit};
use crate::commitment::{CardCommitment, CardOpening};
use crate::evaluator::{self, EvaluationError};
use crate::layout::{Seat, Street, BOARD_CARDS, HOLE_CARDS};
use crate::seed::DeckSeed;
use thiserror::Error;

/// Errors that can occur during witness generation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WitnessError {
    #[error("Hole card {slot} does not open its commitment")]
    CommitmentMismatch { slot: usize },
    #[error("Position {position} holds {actual}, not {claimed}")]
    CardNotAtPosition {
        position: usize,
        claimed: Card,
        actual: Card,
    },
    #[error("{street:?} reveals {expected} cards, got {actual}")]
    WrongCardCount {
        street: Street,
        expected: usize,
        actual: usize,
    },
    #[error("Claimed score {claimed} does not match evaluated score {actual}")]
    ScoreMismatch { claimed: u64, actual: u64 },
    #[error("Hand evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
}

/// Checks each proof relation on concrete values and builds the fully
/// assigned circuit for it.
#[derive(Clone, Copy, Debug, Default)]
pub struct WitnessGenerator;

impl WitnessGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Openings must hold the cards at the seat's positions and open the
    /// published commitments.
    pub fn hole_cards(
        &self,
        deck_seed: &DeckSeed,
        seat: Seat,
        openings: &[CardOpening; HOLE_CARDS],
        commitments: &[CardCommitment; HOLE_CARDS],
    ) -> Result<HoleCardsCircuit, WitnessError> {
        let deck = deck_seed.shuffle();

        for (slot, position) in seat.hole_positions().into_iter().enumerate() {
            let actual = deck.cards()[position];
            if openings[slot].card != actual {
                return Err(WitnessError::CardNotAtPosition {
                    position,
                    claimed: openings[slot].card,
                    actual,
                });
            }
            if !openings[slot].opens(&commitments[slot]) {
                return Err(WitnessError::CommitmentMismatch { slot });
            }
        }

        Ok(HoleCardsCircuit::new(&deck, seat, openings))
    }

    pub fn community_reveal(
        &self,
        deck_seed: &DeckSeed,
        street: Street,
        cards: &[Card],
    ) -> Result<RevealCircuit, WitnessError> {
        if cards.len() != street.card_count() {
            return Err(WitnessError::WrongCardCount {
                street,
                expected: street.card_count(),
                actual: cards.len(),
            });
        }

        let deck = deck_seed.shuffle();
        for (position, claimed) in street.positions().iter().zip(cards) {
            let actual = deck.cards()[*position];
            if *claimed != actual {
                return Err(WitnessError::CardNotAtPosition {
                    position: *position,
                    claimed: *claimed,
                    actual,
                });
            }
        }

        Ok(RevealCircuit::new(&deck, street, cards))
    }

    /// Openings must match the seat's commitments, and the seven cards must
    /// evaluate to exactly the claimed score.
    pub fn hand_reveal(
        &self,
        commitments: &[CardCommitment; HOLE_CARDS],
        board: &[Card; BOARD_CARDS],
        claimed_score: u64,
        openings: &[CardOpening; HOLE_CARDS],
    ) -> Result<HandRevealCircuit, WitnessError> {
        for (slot, (opening, commitment)) in openings.iter().zip(commitments).enumerate() {
            if !opening.opens(commitment) {
                return Err(WitnessError::CommitmentMismatch { slot });
            }
        }

        let rank = evaluator::evaluate_hand(&openings.map(|o| o.card), board)?;
        if rank.score() != claimed_score {
            return Err(WitnessError::ScoreMismatch {
                claimed: claimed_score,
                actual: rank.score(),
            });
        }

        Ok(HandRevealCircuit::new(openings, board, claimed_score))
    }
}
