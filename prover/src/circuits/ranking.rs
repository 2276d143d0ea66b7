//! In-circuit hand ranking that agrees with [`crate::evaluator::evaluate`]
//! score for score.
//!
//! Every card is split into a 52-way one-hot vector. Summing those gives a
//! presence table (forced boolean, so the seven cards are distinct) from
//! which rank counts, suit counts and the flush-suit rank mask follow
//! linearly. Each category is then computed unconditionally and a priority
//! chain keeps the strongest one present, mirroring the evaluator's early
//! returns.

use super::{mul, one_hot, FpWire, Lin};
use crate::cards::{DECK_SIZE, NUM_RANKS, NUM_SUITS, RANK_ACE};
use crate::evaluator::{HandCategory, TIEBREAK_LEN};
use crate::layout::HAND_CARDS;
use ark_bn254::Fr;
use ark_relations::lc;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

const RANKS: usize = NUM_RANKS as usize;
const SUITS: usize = NUM_SUITS as usize;
const WHEEL_TOP: usize = 3;

fn constant(value: u64) -> Fr {
    Fr::from(value)
}

/// Weight of tiebreak slot `slot`, most significant first.
fn slot_weight(slot: usize) -> Fr {
    constant((RANKS as u64).pow((TIEBREAK_LEN - 1 - slot) as u32))
}

fn category_base(category: HandCategory) -> Lin {
    Lin::constant(constant(category as u64) * slot_weight(0) * constant(RANKS as u64))
}

fn enforce_boolean(cs: &ConstraintSystemRef<Fr>, x: &Lin) -> Result<(), SynthesisError> {
    cs.enforce_constraint(x.lc(), (x.clone() - Lin::one()).lc(), lc!())
}

fn and(cs: &ConstraintSystemRef<Fr>, a: &Lin, b: &Lin) -> Result<Lin, SynthesisError> {
    Ok(Lin::from(mul(cs, a, b)?))
}

/// Highest set rank of a boolean mask.
struct Highest {
    select: Vec<Lin>,
    found: Lin,
}

impl Highest {
    fn rank(&self) -> Lin {
        self.select
            .iter()
            .enumerate()
            .map(|(r, s)| s.clone() * constant(r as u64))
            .sum()
    }

    fn without(&self, mask: &[Lin]) -> Vec<Lin> {
        mask.iter()
            .zip(&self.select)
            .map(|(m, s)| m.clone() - s.clone())
            .collect()
    }
}

fn highest(cs: &ConstraintSystemRef<Fr>, mask: &[Lin]) -> Result<Highest, SynthesisError> {
    let mut select = vec![Lin::zero(); RANKS];
    let mut none_above = Lin::one();
    for r in (0..RANKS).rev() {
        let hit = and(cs, &mask[r], &none_above)?;
        none_above = none_above - hit.clone();
        select[r] = hit;
    }
    Ok(Highest {
        select,
        found: Lin::one() - none_above,
    })
}

/// Highest five-rank run, the wheel counting as five-high.
struct Straight {
    found: Lin,
    top: Lin,
    ace_high: Lin,
}

fn straight(cs: &ConstraintSystemRef<Fr>, mask: &[Lin]) -> Result<Straight, SynthesisError> {
    let mut none_above = Lin::one();
    let mut top = Lin::zero();
    let mut ace_high = Lin::zero();

    for high in (WHEEL_TOP..RANKS).rev() {
        let members: Vec<usize> = if high == WHEEL_TOP {
            vec![RANK_ACE as usize, 0, 1, 2, 3]
        } else {
            (high - 4..=high).collect()
        };
        let mut run = mask[members[0]].clone();
        for member in &members[1..] {
            run = and(cs, &run, &mask[*member])?;
        }

        let hit = and(cs, &run, &none_above)?;
        none_above = none_above - hit.clone();
        top = top + hit.clone() * constant(high as u64);
        if high == RANK_ACE as usize {
            ace_high = hit;
        }
    }

    Ok(Straight {
        found: Lin::one() - none_above,
        top,
        ace_high,
    })
}

/// The `take` highest set ranks of `mask`, packed into tiebreak slots
/// starting at `first_slot`.
fn pack_top(
    cs: &ConstraintSystemRef<Fr>,
    mask: &[Lin],
    take: usize,
    first_slot: usize,
) -> Result<Lin, SynthesisError> {
    let mut seen = Lin::zero();
    let mut packed = Lin::zero();

    // Rank zero packs to zero wherever it lands
    for r in (1..RANKS).rev() {
        seen = seen + mask[r].clone();
        let order = one_hot(cs, &seen, HAND_CARDS + 1)?;
        let weight: Lin = (1..=take)
            .map(|nth| {
                let slot = first_slot + nth - 1;
                Lin::from(order[nth]) * (constant(r as u64) * slot_weight(slot))
            })
            .sum();
        packed = packed + and(cs, &mask[r], &weight)?;
    }
    Ok(packed)
}

/// Packed [`crate::evaluator::HandRank::score`] of seven card wires.
///
/// Leaves the system unsatisfied unless every card is in the deck and no
/// card repeats.
pub fn hand_score(
    cs: &ConstraintSystemRef<Fr>,
    cards: &[FpWire; HAND_CARDS],
) -> Result<Lin, SynthesisError> {
    let mut presence = vec![Lin::zero(); DECK_SIZE];
    for card in cards {
        for (cell, bit) in presence.iter_mut().zip(one_hot(cs, &Lin::from(card), DECK_SIZE)?) {
            *cell = cell.clone() + Lin::from(bit);
        }
    }
    for cell in &presence {
        enforce_boolean(cs, cell)?;
    }
    let cell = |suit: usize, rank: usize| presence[suit * RANKS + rank].clone();

    // Rank multiplicities
    let mut present = Vec::with_capacity(RANKS);
    let mut pairs = Vec::with_capacity(RANKS);
    let mut trips = Vec::with_capacity(RANKS);
    let mut quads = Vec::with_capacity(RANKS);
    for rank in 0..RANKS {
        let count: Lin = (0..SUITS).map(|suit| cell(suit, rank)).sum();
        let histogram = one_hot(cs, &count, SUITS + 1)?;
        present.push(Lin::one() - Lin::from(histogram[0]));
        pairs.push(Lin::from(histogram[2]));
        trips.push(Lin::from(histogram[3]));
        quads.push(Lin::from(histogram[4]));
    }

    // At most one suit can reach five of seven cards
    let mut flush_found = Lin::zero();
    let mut flush_mask = vec![Lin::zero(); RANKS];
    for suit in 0..SUITS {
        let count: Lin = (0..RANKS).map(|rank| cell(suit, rank)).sum();
        let histogram = one_hot(cs, &count, HAND_CARDS + 1)?;
        let is_flush: Lin = histogram[5..].iter().map(Lin::from).sum();
        for (rank, slot) in flush_mask.iter_mut().enumerate() {
            *slot = slot.clone() + and(cs, &is_flush, &cell(suit, rank))?;
        }
        flush_found = flush_found + is_flush;
    }

    let straight_flush = straight(cs, &flush_mask)?;
    let quad = highest(cs, &quads)?;
    let first_trips = highest(cs, &trips)?;
    let second_trips = highest(cs, &first_trips.without(&trips))?;
    let first_pair = highest(cs, &pairs)?;
    let second_pair = highest(cs, &first_pair.without(&pairs))?;
    let run = straight(cs, &present)?;

    // Two sets of trips and a pair would need eight cards, so at most one
    // of these is set and their sum is the full house pair rank
    let full_house_pair = second_trips.rank() + first_pair.rank();
    let full_house = and(
        cs,
        &first_trips.found,
        &(second_trips.found.clone() + first_pair.found.clone()),
    )?;

    let w = slot_weight;
    let candidates = [
        (
            straight_flush.found.clone(),
            category_base(HandCategory::StraightFlush)
                + straight_flush.ace_high.clone() * (w(0) * constant(RANKS as u64))
                + straight_flush.top.clone() * w(0),
        ),
        (
            quad.found.clone(),
            category_base(HandCategory::FourOfAKind)
                + quad.rank() * w(0)
                + pack_top(cs, &quad.without(&present), 1, 1)?,
        ),
        (
            full_house,
            category_base(HandCategory::FullHouse)
                + first_trips.rank() * w(0)
                + full_house_pair * w(1),
        ),
        (
            flush_found,
            category_base(HandCategory::Flush) + pack_top(cs, &flush_mask, 5, 0)?,
        ),
        (
            run.found.clone(),
            category_base(HandCategory::Straight) + run.top.clone() * w(0),
        ),
        (
            first_trips.found.clone(),
            category_base(HandCategory::ThreeOfAKind)
                + first_trips.rank() * w(0)
                + pack_top(cs, &first_trips.without(&present), 2, 1)?,
        ),
        (
            second_pair.found.clone(),
            category_base(HandCategory::TwoPair)
                + first_pair.rank() * w(0)
                + second_pair.rank() * w(1)
                + pack_top(cs, &second_pair.without(&first_pair.without(&present)), 1, 2)?,
        ),
        (
            first_pair.found.clone(),
            category_base(HandCategory::OnePair)
                + first_pair.rank() * w(0)
                + pack_top(cs, &first_pair.without(&present), 3, 1)?,
        ),
    ];

    let mut remaining = Lin::one();
    let mut score = Lin::zero();
    for (found, value) in &candidates {
        let chosen = and(cs, found, &remaining)?;
        remaining = remaining - chosen.clone();
        score = score + and(cs, &chosen, value)?;
    }
    let high_card = pack_top(cs, &present, 5, 0)?;
    score = score + and(cs, &remaining, &high_card)?;
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Card;
    use crate::evaluator;
    use ark_relations::r1cs::ConstraintSystem;

    fn circuit_score(values: [u8; HAND_CARDS]) -> (Fr, bool) {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let wires = values.map(|v| FpWire::witness(&cs, constant(v as u64)).unwrap());
        let score = hand_score(&cs, &wires).unwrap();
        (score.value(), cs.is_satisfied().unwrap())
    }

    fn native_score(values: [u8; HAND_CARDS]) -> Fr {
        let cards: Vec<Card> = values.iter().map(|v| Card::new(*v).unwrap()).collect();
        constant(evaluator::evaluate(&cards).unwrap().score())
    }

    fn assert_agrees(values: [u8; HAND_CARDS]) {
        let (score, satisfied) = circuit_score(values);
        assert!(satisfied, "unsatisfied for {values:?}");
        assert_eq!(score, native_score(values), "score mismatch for {values:?}");
    }

    #[test]
    fn test_every_category_matches_evaluator() {
        // Suits: clubs 0..13, diamonds 13..26, hearts 26..39, spades 39..52
        let hands: [[u8; HAND_CARDS]; 10] = [
            [8, 9, 10, 11, 12, 13, 27],   // royal flush
            [0, 1, 2, 3, 12, 20, 33],     // wheel straight flush
            [12, 25, 38, 51, 0, 14, 27],  // quads with a pair kicker pool
            [5, 18, 31, 7, 20, 33, 9],    // two sets of trips
            [0, 2, 4, 6, 8, 9, 22],       // flush with six clubs
            [12, 13, 27, 41, 3, 20, 35],  // wheel straight
            [3, 16, 29, 0, 18, 34, 50],   // trips
            [3, 16, 5, 18, 7, 20, 9],     // three pairs
            [3, 16, 5, 19, 34, 48, 24],   // one pair
            [0, 15, 30, 45, 8, 23, 38],   // high card
        ];
        for hand in hands {
            assert_agrees(hand);
        }
    }

    #[test]
    fn test_random_hands_match_evaluator() {
        use rand::rngs::StdRng;
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let mut rng = StdRng::seed_from_u64(7);
        let mut deck: Vec<u8> = (0..DECK_SIZE as u8).collect();
        for _ in 0..20 {
            deck.shuffle(&mut rng);
            let hand: [u8; HAND_CARDS] = std::array::from_fn(|i| deck[i]);
            assert_agrees(hand);
        }
    }

    #[test]
    fn test_repeated_card_is_unsatisfied() {
        let (_, satisfied) = circuit_score([0, 0, 4, 6, 8, 9, 22]);
        assert!(!satisfied);
    }

    #[test]
    fn test_card_outside_deck_is_unsatisfied() {
        let (_, satisfied) = circuit_score([52, 1, 4, 6, 8, 9, 22]);
        assert!(!satisfied);
    }
}
