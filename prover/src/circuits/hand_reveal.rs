use super::{enforce_equal, enforce_lin_equal, poseidon_gadget, ranking, FpWire, Lin};
use crate::cards::Card;
use crate::commitment::CardOpening;
use crate::layout::{BOARD_CARDS, HAND_CARDS, HOLE_CARDS};
use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

/// Proves the seat's committed hole cards, together with the public board,
/// rank to the claimed score. The hole cards stay private.
///
/// Public inputs, in order: both commitments, the five board cards, score.
#[derive(Clone, Debug)]
pub struct HandRevealCircuit {
    // Private inputs (witness)
    pub hole: [Fr; HOLE_CARDS],
    pub salts: [Fr; HOLE_CARDS],

    // Public inputs (instance)
    pub commitments: [Fr; HOLE_CARDS],
    pub board: [Fr; BOARD_CARDS],
    pub score: Fr,
}

impl HandRevealCircuit {
    pub fn new(
        openings: &[CardOpening; HOLE_CARDS],
        board: &[Card; BOARD_CARDS],
        score: u64,
    ) -> Self {
        Self {
            hole: openings.map(|o| o.card.to_field()),
            salts: openings.map(|o| o.salt),
            commitments: openings.map(|o| o.commitment().as_field()),
            board: board.map(|c| c.to_field()),
            score: Fr::from(score),
        }
    }

    pub fn public_inputs(
        commitments: [Fr; HOLE_CARDS],
        board: &[Card; BOARD_CARDS],
        score: u64,
    ) -> Vec<Fr> {
        let mut inputs = commitments.to_vec();
        inputs.extend(board.iter().map(|c| c.to_field()));
        inputs.push(Fr::from(score));
        inputs
    }
}

impl ConstraintSynthesizer<Fr> for HandRevealCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Public inputs
        let mut commitment_wires = Vec::with_capacity(HOLE_CARDS);
        for commitment in self.commitments {
            commitment_wires.push(FpWire::input(&cs, commitment)?);
        }
        let mut board_wires = Vec::with_capacity(BOARD_CARDS);
        for card in self.board {
            board_wires.push(FpWire::input(&cs, card)?);
        }
        let score = FpWire::input(&cs, self.score)?;

        // Private inputs
        let mut cards = [FpWire::zero(); HAND_CARDS];
        for slot in 0..HOLE_CARDS {
            let card = FpWire::witness(&cs, self.hole[slot])?;
            let salt = FpWire::witness(&cs, self.salts[slot])?;
            let opened = poseidon_gadget::hash(&cs, &[card, salt])?;
            enforce_equal(&cs, &opened, &commitment_wires[slot])?;
            cards[slot] = card;
        }
        cards[HOLE_CARDS..].copy_from_slice(&board_wires);

        let computed = ranking::hand_score(&cs, &cards)?;
        enforce_lin_equal(&cs, &computed, &Lin::from(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator;
    use ark_relations::r1cs::ConstraintSystem;

    fn openings(values: [u8; HOLE_CARDS]) -> [CardOpening; HOLE_CARDS] {
        values.map(|v| CardOpening::new(Card::new(v).unwrap(), Fr::from(1000 + v as u64)))
    }

    fn board(values: [u8; BOARD_CARDS]) -> [Card; BOARD_CARDS] {
        values.map(|v| Card::new(v).unwrap())
    }

    fn is_satisfied(circuit: HandRevealCircuit) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    fn honest(hole: [u8; HOLE_CARDS], table: [u8; BOARD_CARDS]) -> HandRevealCircuit {
        let openings = openings(hole);
        let board = board(table);
        let score = evaluator::evaluate_hand(&openings.map(|o| o.card), &board)
            .unwrap()
            .score();
        HandRevealCircuit::new(&openings, &board, score)
    }

    #[test]
    fn test_honest_score_satisfies_circuit() {
        assert!(is_satisfied(honest([12, 25], [38, 0, 14, 30, 44])));
    }

    #[test]
    fn test_inflated_score_is_unsatisfied() {
        let mut circuit = honest([3, 16], [5, 19, 34, 48, 24]);
        circuit.score += Fr::from(1u64);
        assert!(!is_satisfied(circuit));
    }

    #[test]
    fn test_swapped_hole_card_is_unsatisfied() {
        // Commitments stay bound to the dealt cards
        let mut circuit = honest([3, 16], [5, 19, 34, 48, 24]);
        let better = [Card::new(29).unwrap(), Card::new(42).unwrap()];
        circuit.hole[1] = better[0].to_field();
        let board_cards = board([5, 19, 34, 48, 24]);
        circuit.score = Fr::from(
            evaluator::evaluate_hand(&[Card::new(3).unwrap(), better[0]], &board_cards)
                .unwrap()
                .score(),
        );
        assert!(!is_satisfied(circuit));
    }

    #[test]
    fn test_board_card_reused_as_hole_card_is_unsatisfied() {
        let hole = openings([5, 16]);
        let table = board([5, 19, 34, 48, 24]);
        let circuit = HandRevealCircuit::new(&hole, &table, 0);
        assert!(!is_satisfied(circuit));
    }

    #[test]
    fn test_public_input_order() {
        let circuit = honest([0, 1], [2, 3, 17, 30, 44]);
        let inputs = HandRevealCircuit::public_inputs(
            circuit.commitments,
            &board([2, 3, 17, 30, 44]),
            0,
        );
        let score = circuit.score;

        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        let assigned = cs.borrow().unwrap().instance_assignment.clone();
        // Index 0 is the constant one
        assert_eq!(&assigned[1..8], &inputs[..7]);
        assert_eq!(assigned[8], score);
    }
}
