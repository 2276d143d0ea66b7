use super::deck;
use super::{enforce_equal, FpWire};
use crate::cards::{Card, DECK_SIZE};
use crate::layout::Street;
use crate::shuffle::ShuffledDeck;
use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

/// Proves the announced board cards sit at the street's positions in the
/// deck whose digest is public. Nothing about other positions is exposed.
///
/// Public inputs, in order: deck digest, then `(position, card)` per slot.
/// The constraint system depends on the slot count, so the flop (3) and
/// the turn and river (1) use separate keys.
#[derive(Clone, Debug)]
pub struct RevealCircuit {
    // Private inputs (witness)
    pub deck: [Fr; DECK_SIZE],

    // Public inputs (instance)
    pub deck_digest: Fr,
    pub positions: Vec<usize>,
    pub cards: Vec<Fr>,
}

impl RevealCircuit {
    pub fn new(deck: &ShuffledDeck, street: Street, cards: &[Card]) -> Self {
        Self {
            deck: deck.to_field_elements(),
            deck_digest: deck.digest(),
            positions: street.positions().to_vec(),
            cards: cards.iter().map(|c| c.to_field()).collect(),
        }
    }

    pub fn slots(&self) -> usize {
        self.positions.len()
    }

    pub fn public_inputs(deck_digest: Fr, positions: &[usize], cards: &[Card]) -> Vec<Fr> {
        let mut inputs = vec![deck_digest];
        for (position, card) in positions.iter().zip(cards) {
            inputs.push(Fr::from(*position as u64));
            inputs.push(card.to_field());
        }
        inputs
    }
}

impl ConstraintSynthesizer<Fr> for RevealCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        if self.positions.len() != self.cards.len() {
            return Err(SynthesisError::Unsatisfiable);
        }

        // Public inputs
        let digest = FpWire::input(&cs, self.deck_digest)?;
        let mut slots = Vec::with_capacity(self.positions.len());
        for (position, card) in self.positions.iter().zip(&self.cards) {
            let position_wire = FpWire::input(&cs, Fr::from(*position as u64))?;
            let card_wire = FpWire::input(&cs, *card)?;
            slots.push((*position, position_wire, card_wire));
        }

        // Private inputs
        let deck_wires = deck::allocate_deck(&cs, &self.deck)?;
        deck::enforce_digest(&cs, &deck_wires, &digest)?;

        for (position, position_wire, card_wire) in &slots {
            let at_position = deck::select(&cs, &deck_wires, *position, position_wire)?;
            enforce_equal(&cs, &at_position, card_wire)?;
        }

        Ok(())
    }
}
