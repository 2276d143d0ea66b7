//! Deterministic Fisher-Yates shuffle driven by the deck seed.
//!
//! For `i` from 51 down to 1 the draw is `r = Poseidon(deck_seed, i)` and
//! position `i` swaps with `j = r mod (i + 1)`, where `r` is taken as its
//! canonical integer representative.

use crate::cards::{Card, DECK_SIZE};
use crate::field;
use crate::layout::{Seat, Street, BOARD_CARDS, FLOP_POSITIONS, HOLE_CARDS};
use crate::poseidon;
use ark_bn254::Fr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShuffledDeck([Card; DECK_SIZE]);

pub fn shuffle(deck_seed: &Fr) -> ShuffledDeck {
    let mut deck: [u8; DECK_SIZE] = std::array::from_fn(|i| i as u8);

    for i in (1..DECK_SIZE).rev() {
        let draw = poseidon::hash(&[*deck_seed, Fr::from(i as u64)]);
        let j = field::reduce_to_u64(&draw, (i + 1) as u64) as usize;
        deck.swap(i, j);
    }

    ShuffledDeck(deck.map(Card::from_index))
}

impl ShuffledDeck {
    pub fn cards(&self) -> &[Card; DECK_SIZE] {
        &self.0
    }

    pub fn card_at(&self, position: usize) -> Option<Card> {
        self.0.get(position).copied()
    }

    pub fn hole_cards(&self, seat: Seat) -> [Card; HOLE_CARDS] {
        seat.hole_positions().map(|p| self.0[p])
    }

    /// All five community cards in dealing order.
    pub fn board(&self) -> [Card; BOARD_CARDS] {
        std::array::from_fn(|i| self.0[FLOP_POSITIONS[0] + i])
    }

    pub fn street_cards(&self, street: Street) -> Vec<Card> {
        street.positions().iter().map(|p| self.0[*p]).collect()
    }

    pub fn to_field_elements(&self) -> [Fr; DECK_SIZE] {
        self.0.map(Card::to_field)
    }

    /// `Poseidon(deck[0..52])`, the public value proofs bind the deck to.
    pub fn digest(&self) -> Fr {
        poseidon::hash(&self.to_field_elements())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_permutation(deck: &ShuffledDeck) -> bool {
        let mut seen = [false; DECK_SIZE];
        for card in deck.cards() {
            if std::mem::replace(&mut seen[card.index() as usize], true) {
                return false;
            }
        }
        seen.iter().all(|s| *s)
    }

    #[test]
    fn test_shuffle_is_a_bijection() {
        for seed in 0..200u64 {
            let deck = shuffle(&Fr::from(seed));
            assert!(is_permutation(&deck), "seed {seed} produced a non-permutation");
        }
    }

    #[test]
    fn test_shuffle_is_deterministic() {
        let seed = Fr::from(0xdead_beefu64);
        assert_eq!(shuffle(&seed), shuffle(&seed));
        assert_eq!(shuffle(&seed).digest(), shuffle(&seed).digest());
    }

    #[test]
    fn test_distinct_seeds_give_distinct_orderings() {
        let orderings: HashSet<Vec<u8>> = (0..100u64)
            .map(|s| shuffle(&Fr::from(s)).cards().iter().map(|c| c.index()).collect())
            .collect();
        assert_eq!(orderings.len(), 100);
    }

    #[test]
    fn test_layout_accessors_follow_positions() {
        let deck = shuffle(&Fr::from(42u64));
        let cards = deck.cards();
        assert_eq!(deck.hole_cards(Seat::FIRST), [cards[0], cards[1]]);
        assert_eq!(deck.hole_cards(Seat::SECOND), [cards[2], cards[3]]);
        assert_eq!(deck.street_cards(Street::Flop), cards[4..7].to_vec());
        assert_eq!(deck.street_cards(Street::River), vec![cards[8]]);
        assert_eq!(deck.board().to_vec(), cards[4..9].to_vec());
        assert_eq!(deck.card_at(52), None);
    }

    #[test]
    fn test_digest_commits_to_order() {
        let a = shuffle(&Fr::from(1u64));
        let b = shuffle(&Fr::from(2u64));
        assert_ne!(a.digest(), b.digest());
    }
}
