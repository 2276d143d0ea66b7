//! Card encoding: index `i` in `0..52` has rank `i % 13` (2 through Ace)
//! and suit `i / 13`.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DECK_SIZE: usize = 52;
pub const NUM_RANKS: u8 = 13;
pub const NUM_SUITS: u8 = 4;

pub const RANK_TEN: u8 = 8;
pub const RANK_ACE: u8 = 12;

const RANK_SYMBOLS: [char; 13] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'A',
];
const SUIT_SYMBOLS: [char; 4] = ['c', 'd', 'h', 's'];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CardError {
    #[error("Card index {0} is outside the 52-card deck")]
    OutOfRange(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Card(u8);

impl Card {
    pub fn new(index: u8) -> Result<Self, CardError> {
        Self::from_u64(index as u64)
    }

    pub fn from_u64(index: u64) -> Result<Self, CardError> {
        if index < DECK_SIZE as u64 {
            Ok(Self(index as u8))
        } else {
            Err(CardError::OutOfRange(index))
        }
    }

    /// Caller guarantees `index < 52`.
    pub(crate) const fn from_index(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn rank(self) -> u8 {
        self.0 % NUM_RANKS
    }

    pub fn suit(self) -> u8 {
        self.0 / NUM_RANKS
    }

    pub fn to_field(self) -> Fr {
        Fr::from(self.0 as u64)
    }

    /// All 52 cards in index order.
    pub fn all() -> impl Iterator<Item = Card> {
        (0..DECK_SIZE as u8).map(Card)
    }
}

impl TryFrom<u8> for Card {
    type Error = CardError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Card::new(index)
    }
}

impl From<Card> for u8 {
    fn from(card: Card) -> u8 {
        card.0
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            RANK_SYMBOLS[self.rank() as usize],
            SUIT_SYMBOLS[self.suit() as usize]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_rank_and_suit_decomposition() {
        let ace_of_clubs = Card::new(12).unwrap();
        assert_eq!(ace_of_clubs.rank(), RANK_ACE);
        assert_eq!(ace_of_clubs.suit(), 0);

        let two_of_diamonds = Card::new(13).unwrap();
        assert_eq!(two_of_diamonds.rank(), 0);
        assert_eq!(two_of_diamonds.suit(), 1);

        let ace_of_spades = Card::new(51).unwrap();
        assert_eq!(ace_of_spades.to_string(), "As");
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_matches!(Card::new(52), Err(CardError::OutOfRange(52)));
        assert_matches!(Card::from_u64(u64::MAX), Err(CardError::OutOfRange(_)));
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        let card: Card = serde_json::from_str("51").unwrap();
        assert_eq!(card.index(), 51);
        assert!(serde_json::from_str::<Card>("52").is_err());
    }

    #[test]
    fn test_all_enumerates_deck() {
        assert_eq!(Card::all().count(), DECK_SIZE);
        assert_eq!(Card::all().last().map(Card::index), Some(51));
    }
}
