//! Fixed dealing layout over the shuffled deck.
//!
//! Seat 0 holds positions 0 and 1, seat 1 holds 2 and 3, the flop is
//! 4..=6, the turn 7 and the river 8. Positions 9.. are never dealt.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const NUM_SEATS: usize = 2;
pub const HOLE_CARDS: usize = 2;
pub const BOARD_CARDS: usize = 5;
pub const HAND_CARDS: usize = HOLE_CARDS + BOARD_CARDS;

pub const FLOP_POSITIONS: [usize; 3] = [4, 5, 6];
pub const TURN_POSITION: usize = 7;
pub const RIVER_POSITION: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Unknown seat {0}")]
    UnknownSeat(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Seat(u8);

impl Seat {
    pub const FIRST: Seat = Seat(0);
    pub const SECOND: Seat = Seat(1);

    pub fn new(index: u64) -> Result<Self, LayoutError> {
        if index < NUM_SEATS as u64 {
            Ok(Self(index as u8))
        } else {
            Err(LayoutError::UnknownSeat(index))
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn other(self) -> Seat {
        Seat(1 - self.0)
    }

    pub fn all() -> [Seat; NUM_SEATS] {
        [Seat::FIRST, Seat::SECOND]
    }

    pub fn hole_positions(self) -> [usize; HOLE_CARDS] {
        let base = self.index() * HOLE_CARDS;
        [base, base + 1]
    }
}

impl TryFrom<u8> for Seat {
    type Error = LayoutError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Seat::new(index as u64)
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> u8 {
        seat.0
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Street {
    Flop,
    Turn,
    River,
}

impl Street {
    pub const ALL: [Street; 3] = [Street::Flop, Street::Turn, Street::River];

    pub fn positions(self) -> &'static [usize] {
        match self {
            Street::Flop => &FLOP_POSITIONS,
            Street::Turn => &[TURN_POSITION],
            Street::River => &[RIVER_POSITION],
        }
    }

    pub fn card_count(self) -> usize {
        self.positions().len()
    }

    /// Number of board cards already public before this street is revealed.
    pub fn board_offset(self) -> usize {
        match self {
            Street::Flop => 0,
            Street::Turn => 3,
            Street::River => 4,
        }
    }

    pub fn next(self) -> Option<Street> {
        match self {
            Street::Flop => Some(Street::Turn),
            Street::Turn => Some(Street::River),
            Street::River => None,
        }
    }
}
