//! Deck gadgets: bind a private deck witness to its public digest and pick
//! the card at a public position without revealing any other position.

use super::{enforce_equal, poseidon_gadget, FpWire};
use crate::cards::DECK_SIZE;
use ark_bn254::Fr;
use ark_ff::{One, Zero};
use ark_relations::lc;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError, Variable};

pub fn allocate_deck(
    cs: &ConstraintSystemRef<Fr>,
    deck: &[Fr; DECK_SIZE],
) -> Result<Vec<FpWire>, SynthesisError> {
    deck.iter().map(|card| FpWire::witness(cs, *card)).collect()
}

/// Poseidon(deck) == digest
pub fn enforce_digest(
    cs: &ConstraintSystemRef<Fr>,
    deck: &[FpWire],
    digest: &FpWire,
) -> Result<(), SynthesisError> {
    let computed = poseidon_gadget::hash(cs, deck)?;
    enforce_equal(cs, &computed, digest)
}

/// Returns a wire equal to `deck[position]`.
///
/// Uses a one-hot selector: 52 booleans summing to one whose weighted index
/// sum equals the public position wire. A position outside the deck leaves
/// every selector at zero and the circuit unsatisfied.
pub fn select(
    cs: &ConstraintSystemRef<Fr>,
    deck: &[FpWire],
    position: usize,
    position_wire: &FpWire,
) -> Result<FpWire, SynthesisError> {
    let mut selector_sum = lc!();
    let mut weighted_sum = lc!();
    let mut picked_sum = lc!();
    let mut picked_value = Fr::zero();

    for (k, card) in deck.iter().enumerate() {
        let bit = if k == position { Fr::one() } else { Fr::zero() };
        let selector = FpWire::witness(cs, bit)?;

        // s * (s - 1) = 0
        cs.enforce_constraint(
            lc!() + selector.variable,
            lc!() + selector.variable - Variable::One,
            lc!(),
        )?;

        let picked = FpWire::witness(cs, bit * card.value)?;
        cs.enforce_constraint(
            lc!() + selector.variable,
            lc!() + card.variable,
            lc!() + picked.variable,
        )?;

        selector_sum = selector_sum + selector.variable;
        weighted_sum = weighted_sum + (Fr::from(k as u64), selector.variable);
        picked_sum = picked_sum + picked.variable;
        picked_value += picked.value;
    }

    cs.enforce_constraint(selector_sum, lc!() + Variable::One, lc!() + Variable::One)?;
    cs.enforce_constraint(
        weighted_sum,
        lc!() + Variable::One,
        lc!() + position_wire.variable,
    )?;

    let out = FpWire::witness(cs, picked_value)?;
    cs.enforce_constraint(picked_sum, lc!() + Variable::One, lc!() + out.variable)?;
    Ok(out)
}
