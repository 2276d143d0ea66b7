//! Best-five-of-seven hold'em hand evaluation.
//!
//! A [`HandRank`] orders first by category and then by a five-rank
//! tiebreak (most significant first, zero filled). The derived ordering
//! agrees with [`HandRank::score`], which packs the same data into
//! `category * 13^5 + sum(tiebreak[i] * 13^(4 - i))`.

use crate::cards::{Card, CardError, NUM_RANKS, NUM_SUITS, RANK_ACE};
use crate::layout::{BOARD_CARDS, HAND_CARDS, HOLE_CARDS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TIEBREAK_LEN: usize = 5;
const RADIX: u64 = NUM_RANKS as u64;
const CATEGORY_WEIGHT: u64 = RADIX * RADIX * RADIX * RADIX * RADIX;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Hand evaluation needs exactly {expected} cards, got {actual}")]
    WrongCardCount { expected: usize, actual: usize },
    #[error("Card {0} appears more than once")]
    DuplicateCard(Card),
    #[error(transparent)]
    InvalidCard(#[from] CardError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
    RoyalFlush = 9,
}

impl HandCategory {
    pub const ALL: [HandCategory; 10] = [
        HandCategory::HighCard,
        HandCategory::OnePair,
        HandCategory::TwoPair,
        HandCategory::ThreeOfAKind,
        HandCategory::Straight,
        HandCategory::Flush,
        HandCategory::FullHouse,
        HandCategory::FourOfAKind,
        HandCategory::StraightFlush,
        HandCategory::RoyalFlush,
    ];

    pub fn from_index(index: u64) -> Option<Self> {
        Self::ALL.get(usize::try_from(index).ok()?).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandRank {
    pub category: HandCategory,
    pub tiebreak: [u8; TIEBREAK_LEN],
}

impl HandRank {
    fn new(category: HandCategory, ranks: &[u8]) -> Self {
        let mut tiebreak = [0u8; TIEBREAK_LEN];
        for (slot, rank) in tiebreak.iter_mut().zip(ranks) {
            *slot = *rank;
        }
        Self { category, tiebreak }
    }

    /// Largest score any hand can produce.
    pub const MAX_SCORE: u64 = 10 * CATEGORY_WEIGHT - 1;

    pub fn score(&self) -> u64 {
        let tiebreak = self
            .tiebreak
            .iter()
            .fold(0u64, |acc, rank| acc * RADIX + *rank as u64);
        self.category as u64 * CATEGORY_WEIGHT + tiebreak
    }

    /// Decode a packed score. Returns `None` for values no hand can produce.
    pub fn from_score(score: u64) -> Option<Self> {
        let category = HandCategory::from_index(score / CATEGORY_WEIGHT)?;
        let mut rest = score % CATEGORY_WEIGHT;
        let mut tiebreak = [0u8; TIEBREAK_LEN];
        for slot in tiebreak.iter_mut().rev() {
            *slot = (rest % RADIX) as u8;
            rest /= RADIX;
        }
        Some(Self { category, tiebreak })
    }
}

/// Evaluate the best five-card hand among exactly seven distinct cards.
pub fn evaluate(cards: &[Card]) -> Result<HandRank, EvaluationError> {
    if cards.len() != HAND_CARDS {
        return Err(EvaluationError::WrongCardCount {
            expected: HAND_CARDS,
            actual: cards.len(),
        });
    }

    let mut seen = 0u64;
    for card in cards {
        let bit = 1u64 << card.index();
        if seen & bit != 0 {
            return Err(EvaluationError::DuplicateCard(*card));
        }
        seen |= bit;
    }

    Ok(rank_distinct(cards))
}

/// Evaluate raw card values, rejecting anything outside the deck.
pub fn evaluate_values(values: &[u64]) -> Result<HandRank, EvaluationError> {
    let cards = values
        .iter()
        .map(|v| Card::from_u64(*v))
        .collect::<Result<Vec<_>, _>>()?;
    evaluate(&cards)
}

pub fn evaluate_hand(
    hole: &[Card; HOLE_CARDS],
    board: &[Card; BOARD_CARDS],
) -> Result<HandRank, EvaluationError> {
    let cards: Vec<Card> = hole.iter().chain(board.iter()).copied().collect();
    evaluate(&cards)
}

/// Highest straight in a rank bitmask, counting A-2-3-4-5 as five-high.
fn straight_top(mask: u16) -> Option<u8> {
    const RUN: u16 = 0b1_1111;
    if let Some(top) = (4..NUM_RANKS).rev().find(|top| (mask >> (*top - 4)) & RUN == RUN) {
        return Some(top);
    }
    const WHEEL: u16 = (1 << RANK_ACE) | 0b1111;
    (mask & WHEEL == WHEEL).then_some(3)
}

fn ranks_desc(mask: u16) -> impl Iterator<Item = u8> {
    (0..NUM_RANKS).rev().filter(move |r| mask & (1u16 << *r) != 0)
}

fn rank_distinct(cards: &[Card]) -> HandRank {
    let mut rank_counts = [0u8; NUM_RANKS as usize];
    let mut suit_masks = [0u16; NUM_SUITS as usize];
    for card in cards {
        rank_counts[card.rank() as usize] += 1;
        suit_masks[card.suit() as usize] |= 1 << card.rank();
    }
    let present: u16 = suit_masks.iter().fold(0, |acc, m| acc | m);

    let flush_mask = suit_masks.iter().copied().find(|m| m.count_ones() >= 5);

    if let Some(top) = flush_mask.and_then(straight_top) {
        let category = if top == RANK_ACE {
            HandCategory::RoyalFlush
        } else {
            HandCategory::StraightFlush
        };
        return HandRank::new(category, &[top]);
    }

    // Ranks grouped by multiplicity, each list highest first
    let of_count = |n: u8| -> Vec<u8> {
        (0..NUM_RANKS)
            .rev()
            .filter(|r| rank_counts[*r as usize] == n)
            .collect()
    };
    let quads = of_count(4);
    let trips = of_count(3);
    let pairs = of_count(2);
    let kickers = |exclude: &[u8], take: usize| -> Vec<u8> {
        ranks_desc(present)
            .filter(|r| !exclude.contains(r))
            .take(take)
            .collect()
    };

    if let Some(&quad) = quads.first() {
        let mut tb = vec![quad];
        tb.extend(kickers(&[quad], 1));
        return HandRank::new(HandCategory::FourOfAKind, &tb);
    }

    if let Some(&trip) = trips.first() {
        // A second set of trips plays as the pair
        let pair = trips.get(1).into_iter().chain(pairs.first()).copied().max();
        if let Some(pair) = pair {
            return HandRank::new(HandCategory::FullHouse, &[trip, pair]);
        }
    }

    if let Some(mask) = flush_mask {
        let tb: Vec<u8> = ranks_desc(mask).take(5).collect();
        return HandRank::new(HandCategory::Flush, &tb);
    }

    if let Some(top) = straight_top(present) {
        return HandRank::new(HandCategory::Straight, &[top]);
    }

    if let Some(&trip) = trips.first() {
        let mut tb = vec![trip];
        tb.extend(kickers(&[trip], 2));
        return HandRank::new(HandCategory::ThreeOfAKind, &tb);
    }

    if pairs.len() >= 2 {
        let (high, low) = (pairs[0], pairs[1]);
        let mut tb = vec![high, low];
        tb.extend(kickers(&[high, low], 1));
        return HandRank::new(HandCategory::TwoPair, &tb);
    }

    if let Some(&pair) = pairs.first() {
        let mut tb = vec![pair];
        tb.extend(kickers(&[pair], 3));
        return HandRank::new(HandCategory::OnePair, &tb);
    }

    HandRank::new(HandCategory::HighCard, &kickers(&[], 5))
}
