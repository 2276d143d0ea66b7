//! Commit-then-reveal exchange of the two seats' seeds.
//!
//! Idle -> Committing -> Revealing -> DeckSeedReady. Reveals open only after
//! both commitments are recorded, and the deck seed exists only once both
//! reveals have matched their commitments.

use prover::layout::NUM_SEATS;
use prover::seed::{DeckSeed, RevealedSeeds, Seed, SeedCommitment};
use prover::Seat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedExchangeError {
    #[error("Seat {0} already committed a seed")]
    DuplicateCommit(Seat),
    #[error("Seat {0} committed after reveals began")]
    StaleCommit(Seat),
    #[error("Seat {0} revealed before both seed commitments were recorded")]
    RevealBeforeCommitPhase(Seat),
    #[error("Seat {0} already revealed its seed")]
    DuplicateReveal(Seat),
    #[error("Seat {0} revealed a seed that does not match its commitment")]
    SeedRevealMismatch(Seat),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPhase {
    Idle,
    Committing,
    Revealing,
    DeckSeedReady,
}

#[derive(Clone, Debug, Default)]
pub struct SeedExchange {
    commitments: [Option<SeedCommitment>; NUM_SEATS],
    reveals: [Option<Seed>; NUM_SEATS],
    deck_seed: Option<DeckSeed>,
}

impl SeedExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SeedPhase {
        if self.deck_seed.is_some() {
            SeedPhase::DeckSeedReady
        } else if self.commitments.iter().all(Option::is_some) {
            SeedPhase::Revealing
        } else if self.commitments.iter().any(Option::is_some) {
            SeedPhase::Committing
        } else {
            SeedPhase::Idle
        }
    }

    pub fn is_committed(&self, seat: Seat) -> bool {
        self.commitments[seat.index()].is_some()
    }

    pub fn is_revealed(&self, seat: Seat) -> bool {
        self.reveals[seat.index()].is_some()
    }

    pub fn commitment(&self, seat: Seat) -> Option<&SeedCommitment> {
        self.commitments[seat.index()].as_ref()
    }

    pub fn deck_seed(&self) -> Option<&DeckSeed> {
        self.deck_seed.as_ref()
    }

    pub fn commit(
        &mut self,
        seat: Seat,
        commitment: SeedCommitment,
    ) -> Result<SeedPhase, SeedExchangeError> {
        if self.reveals.iter().any(Option::is_some) {
            return Err(SeedExchangeError::StaleCommit(seat));
        }
        if self.is_committed(seat) {
            return Err(SeedExchangeError::DuplicateCommit(seat));
        }

        self.commitments[seat.index()] = Some(commitment);
        Ok(self.phase())
    }

    /// Returns the deck seed once this reveal completes the pair.
    pub fn reveal(
        &mut self,
        seat: Seat,
        seed: Seed,
    ) -> Result<Option<DeckSeed>, SeedExchangeError> {
        if self.phase() < SeedPhase::Revealing {
            return Err(SeedExchangeError::RevealBeforeCommitPhase(seat));
        }
        if self.is_revealed(seat) {
            return Err(SeedExchangeError::DuplicateReveal(seat));
        }

        let matches = self
            .commitment(seat)
            .map(|c| c.matches(&seed))
            .unwrap_or(false);
        if !matches {
            return Err(SeedExchangeError::SeedRevealMismatch(seat));
        }

        self.reveals[seat.index()] = Some(seed);

        if let [Some(first), Some(second)] = self.reveals {
            let deck_seed = RevealedSeeds::new([first, second]).deck_seed();
            self.deck_seed = Some(deck_seed);
            return Ok(Some(deck_seed));
        }
        Ok(None)
    }
}
