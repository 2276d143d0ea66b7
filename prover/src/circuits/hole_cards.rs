use super::deck;
use super::{enforce_equal, poseidon_gadget, FpWire};
use crate::cards::DECK_SIZE;
use crate::commitment::CardOpening;
use crate::layout::{Seat, HOLE_CARDS};
use crate::shuffle::ShuffledDeck;
use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

/// Proves a seat's two card commitments open to the cards at its hole
/// positions in the deck whose digest is public.
///
/// Public inputs, in order: deck digest, both positions, both commitments.
#[derive(Clone, Debug)]
pub struct HoleCardsCircuit {
    // Private inputs (witness)
    pub deck: [Fr; DECK_SIZE],
    pub salts: [Fr; HOLE_CARDS],

    // Public inputs (instance)
    pub deck_digest: Fr,
    pub positions: [usize; HOLE_CARDS],
    pub commitments: [Fr; HOLE_CARDS],
}

impl HoleCardsCircuit {
    pub fn new(deck: &ShuffledDeck, seat: Seat, openings: &[CardOpening; HOLE_CARDS]) -> Self {
        Self {
            deck: deck.to_field_elements(),
            salts: openings.map(|o| o.salt),
            deck_digest: deck.digest(),
            positions: seat.hole_positions(),
            commitments: openings.map(|o| o.commitment().as_field()),
        }
    }

    /// Public inputs in allocation order, as the verifier rebuilds them.
    pub fn public_inputs(
        deck_digest: Fr,
        positions: [usize; HOLE_CARDS],
        commitments: [Fr; HOLE_CARDS],
    ) -> Vec<Fr> {
        let mut inputs = vec![deck_digest];
        inputs.extend(positions.iter().map(|p| Fr::from(*p as u64)));
        inputs.extend(commitments);
        inputs
    }
}

impl ConstraintSynthesizer<Fr> for HoleCardsCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Public inputs
        let digest = FpWire::input(&cs, self.deck_digest)?;
        let mut position_wires = Vec::with_capacity(HOLE_CARDS);
        for position in self.positions {
            position_wires.push(FpWire::input(&cs, Fr::from(position as u64))?);
        }
        let mut commitment_wires = Vec::with_capacity(HOLE_CARDS);
        for commitment in self.commitments {
            commitment_wires.push(FpWire::input(&cs, commitment)?);
        }

        // Private inputs
        let deck_wires = deck::allocate_deck(&cs, &self.deck)?;
        deck::enforce_digest(&cs, &deck_wires, &digest)?;

        for slot in 0..HOLE_CARDS {
            let card = deck::select(&cs, &deck_wires, self.positions[slot], &position_wires[slot])?;
            let salt = FpWire::witness(&cs, self.salts[slot])?;
            let opened = poseidon_gadget::hash(&cs, &[card, salt])?;
            enforce_equal(&cs, &opened, &commitment_wires[slot])?;
        }

        Ok(())
    }
}
