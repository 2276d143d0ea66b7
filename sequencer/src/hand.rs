//! Authoritative per-hand state machine.
//!
//! Stages advance only on evidence the sequencer can check itself: seed
//! commitments and reveals, or proof verdicts handed in by the service after
//! the oracle has run. Proof-backed steps are split in two: a `*_statement`
//! call validates the submission and returns the public inputs to verify,
//! and the matching `apply_*` call re-validates and records it once the
//! verdict is known. Nothing is written to the state before a positive
//! verdict.

use crate::config::StageTimeouts;
use crate::events::HandEvent;
use crate::seed_exchange::{SeedExchange, SeedExchangeError, SeedPhase};
use crate::showdown;
use chrono::{DateTime, Utc};
use prover::layout::{LayoutError, BOARD_CARDS, HOLE_CARDS, NUM_SEATS};
use prover::{
    Card, CardCommitment, CircuitId, DeckSeed, HandRank, PublicInputs, Seat, Seed,
    SeedCommitment, Street,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Waiting,
    SeedCommit,
    SeedReveal,
    CardCommit,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
    Completed,
    Aborted,
}

impl Stage {
    pub fn is_betting_stage(self) -> bool {
        matches!(
            self,
            Stage::PreFlop | Stage::Flop | Stage::Turn | Stage::River
        )
    }

    /// Stage entered when the betting round of `self` closes.
    pub fn next_betting_stage(self) -> Option<Stage> {
        match self {
            Stage::PreFlop => Some(Stage::Flop),
            Stage::Flop => Some(Stage::Turn),
            Stage::Turn => Some(Stage::River),
            Stage::River => Some(Stage::Showdown),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed | Stage::Aborted)
    }

    pub fn street(self) -> Option<Street> {
        match self {
            Stage::Flop => Some(Street::Flop),
            Stage::Turn => Some(Street::Turn),
            Stage::River => Some(Street::River),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How an error affects the hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Possible cheating. The hand aborts.
    Violation,
    /// The oracle rejected a proof. The hand aborts.
    ProofRejection,
    /// A deadline passed. The hand resolves through forfeit or abort.
    Liveness,
    /// Misuse by the driving layer. Nothing changes.
    Caller,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandError {
    #[error("Hand is already finished")]
    HandFinished,
    #[error("Unknown seat: {0}")]
    UnknownSeat(#[from] LayoutError),
    #[error("{operation} is not allowed in stage {stage}")]
    InvalidStage {
        operation: &'static str,
        stage: Stage,
    },
    #[error("Seat {0} is already bonded")]
    AlreadyBonded(Seat),
    #[error("Seat {0} has not been bonded")]
    NotBonded(Seat),
    #[error("{0:?} betting cannot close before the board reveal")]
    RevealPending(Street),
    #[error("Seat {seat} sent a {operation} during stage {stage}")]
    OutOfOrder {
        seat: Seat,
        operation: &'static str,
        stage: Stage,
    },
    #[error(transparent)]
    SeedExchange(#[from] SeedExchangeError),
    #[error("Seat {0} already committed its hole cards")]
    DuplicateCardCommit(Seat),
    #[error("Expected the {expected:?} reveal, got {actual:?}")]
    RevealOutOfOrder { expected: Street, actual: Street },
    #[error("{0:?} has already been revealed")]
    StreetAlreadyRevealed(Street),
    #[error("{street:?} reveals {expected} cards, got {actual}")]
    WrongRevealCount {
        street: Street,
        expected: usize,
        actual: usize,
    },
    #[error("Seat {0} already revealed its hand")]
    DuplicateHandReveal(Seat),
    #[error("Score {0} does not encode any hand")]
    InvalidScore(u64),
    #[error("Seat {seat} submitted a rejected {circuit:?} proof")]
    ProofRejected { seat: Seat, circuit: CircuitId },
    #[error("Deadline for stage {0} has passed")]
    DeadlineExpired(Stage),
}

impl HandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HandError::HandFinished
            | HandError::UnknownSeat(_)
            | HandError::InvalidStage { .. }
            | HandError::AlreadyBonded(_)
            | HandError::NotBonded(_)
            | HandError::RevealPending(_) => ErrorKind::Caller,
            HandError::OutOfOrder { .. }
            | HandError::SeedExchange(_)
            | HandError::DuplicateCardCommit(_)
            | HandError::RevealOutOfOrder { .. }
            | HandError::StreetAlreadyRevealed(_)
            | HandError::WrongRevealCount { .. }
            | HandError::DuplicateHandReveal(_)
            | HandError::InvalidScore(_) => ErrorKind::Violation,
            HandError::ProofRejected { .. } => ErrorKind::ProofRejection,
            HandError::DeadlineExpired(_) => ErrorKind::Liveness,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    Violation { seat: Option<Seat>, detail: String },
    ProofRejected { seat: Seat, circuit: CircuitId },
    Timeout { stage: Stage },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Showdown,
    Fold,
    Forfeit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum HandOutcome {
    Won {
        winners: Vec<Seat>,
        resolution: Resolution,
        /// Winning rank when it was proven at showdown.
        best: Option<HandRank>,
    },
    Aborted {
        reason: AbortReason,
    },
}

#[derive(Clone, Debug, Default)]
struct SeatState {
    bonded: bool,
    card_commitments: Option<[CardCommitment; HOLE_CARDS]>,
    hand_rank: Option<HandRank>,
    folded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub seat: Seat,
    pub bonded: bool,
    pub seed_committed: bool,
    pub seed_revealed: bool,
    pub cards_committed: bool,
    pub hand_revealed: bool,
    pub folded: bool,
    pub card_commitments: Option<[CardCommitment; HOLE_CARDS]>,
    pub hand_rank: Option<HandRank>,
}

/// Serializable snapshot of a hand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandView {
    pub id: Uuid,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub seats: Vec<SeatView>,
    pub deck_seed: Option<DeckSeed>,
    pub community: Vec<Card>,
    pub reveal_pending: bool,
    pub to_act: Option<Seat>,
    pub outcome: Option<HandOutcome>,
}

#[derive(Clone, Debug)]
pub struct HandState {
    id: Uuid,
    stage: Stage,
    timeouts: StageTimeouts,
    created_at: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
    seats: [SeatState; NUM_SEATS],
    seeds: SeedExchange,
    community: Vec<Card>,
    to_act: Option<Seat>,
    outcome: Option<HandOutcome>,
    outbox: Vec<HandEvent>,
}

fn verdict(verified: bool, seat: Seat, circuit: CircuitId) -> Result<(), HandError> {
    if verified {
        Ok(())
    } else {
        Err(HandError::ProofRejected { seat, circuit })
    }
}

fn chrono_duration(timeout: std::time::Duration) -> chrono::Duration {
    // Timeouts are validated to at most a few minutes
    chrono::Duration::milliseconds(timeout.as_millis() as i64)
}

impl HandState {
    pub fn new(id: Uuid, timeouts: StageTimeouts, now: DateTime<Utc>) -> Self {
        let mut hand = Self {
            id,
            stage: Stage::Waiting,
            timeouts,
            created_at: now,
            deadline: None,
            seats: Default::default(),
            seeds: SeedExchange::new(),
            community: Vec::with_capacity(BOARD_CARDS),
            to_act: None,
            outcome: None,
            outbox: Vec::new(),
        };
        hand.refresh_deadline(now);
        hand
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn outcome(&self) -> Option<&HandOutcome> {
        self.outcome.as_ref()
    }

    pub fn deck_seed(&self) -> Option<&DeckSeed> {
        self.seeds.deck_seed()
    }

    pub fn community(&self) -> &[Card] {
        &self.community
    }

    pub fn is_finished(&self) -> bool {
        self.stage.is_terminal()
    }

    /// True while a street stage still waits for its board cards.
    pub fn reveal_pending(&self) -> bool {
        self.stage
            .street()
            .map(|street| self.community.len() < street.board_offset() + street.card_count())
            .unwrap_or(false)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_finished() && self.deadline.map_or(false, |deadline| now >= deadline)
    }

    /// Events produced since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<HandEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn view(&self) -> HandView {
        let seats = Seat::all()
            .into_iter()
            .map(|seat| {
                let state = &self.seats[seat.index()];
                SeatView {
                    seat,
                    bonded: state.bonded,
                    seed_committed: self.seeds.is_committed(seat),
                    seed_revealed: self.seeds.is_revealed(seat),
                    cards_committed: state.card_commitments.is_some(),
                    hand_revealed: state.hand_rank.is_some(),
                    folded: state.folded,
                    card_commitments: state.card_commitments,
                    hand_rank: state.hand_rank,
                }
            })
            .collect();

        HandView {
            id: self.id,
            stage: self.stage,
            created_at: self.created_at,
            deadline: self.deadline,
            seats,
            deck_seed: self.seeds.deck_seed().copied(),
            community: self.community.clone(),
            reveal_pending: self.reveal_pending(),
            to_act: self.to_act,
            outcome: self.outcome.clone(),
        }
    }

    // Escrow layer

    pub fn bond_seat(&mut self, seat: Seat, now: DateTime<Utc>) -> Result<(), HandError> {
        self.ensure_live(now)?;
        self.require_stage(Stage::Waiting, "bond seat")?;
        let state = &mut self.seats[seat.index()];
        if state.bonded {
            return Err(HandError::AlreadyBonded(seat));
        }
        state.bonded = true;
        debug!(hand_id = %self.id, %seat, "Seat bonded");
        Ok(())
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), HandError> {
        self.ensure_live(now)?;
        self.require_stage(Stage::Waiting, "start")?;
        if let Some(seat) = Seat::all()
            .into_iter()
            .find(|seat| !self.seats[seat.index()].bonded)
        {
            return Err(HandError::NotBonded(seat));
        }

        info!(hand_id = %self.id, "Hand started");
        self.outbox.push(HandEvent::HandStarted { hand_id: self.id });
        self.transition(Stage::SeedCommit, now);
        Ok(())
    }

    // Seed exchange

    pub fn commit_seed(
        &mut self,
        seat: Seat,
        commitment: SeedCommitment,
        now: DateTime<Utc>,
    ) -> Result<(), HandError> {
        self.ensure_live(now)?;
        let result = self.try_commit_seed(seat, commitment, now);
        self.settle(Some(seat), now, result)
    }

    fn try_commit_seed(
        &mut self,
        seat: Seat,
        commitment: SeedCommitment,
        now: DateTime<Utc>,
    ) -> Result<(), HandError> {
        self.require_seed_stage(seat, "seed commit")?;
        let phase = self.seeds.commit(seat, commitment)?;
        debug!(hand_id = %self.id, %seat, "Seed commitment recorded");
        if phase == SeedPhase::Revealing && self.stage == Stage::SeedCommit {
            self.transition(Stage::SeedReveal, now);
        }
        Ok(())
    }

    pub fn reveal_seed(
        &mut self,
        seat: Seat,
        seed: Seed,
        now: DateTime<Utc>,
    ) -> Result<(), HandError> {
        self.ensure_live(now)?;
        let result = self.try_reveal_seed(seat, seed, now);
        self.settle(Some(seat), now, result)
    }

    fn try_reveal_seed(
        &mut self,
        seat: Seat,
        seed: Seed,
        now: DateTime<Utc>,
    ) -> Result<(), HandError> {
        self.require_seed_stage(seat, "seed reveal")?;
        if let Some(deck_seed) = self.seeds.reveal(seat, seed)? {
            info!(hand_id = %self.id, deck_seed = %deck_seed.to_hex(), "Deck seed ready");
            self.transition(Stage::CardCommit, now);
        } else {
            debug!(hand_id = %self.id, %seat, "Seed reveal recorded");
        }
        Ok(())
    }

    // Hole-card commitments

    pub fn hole_cards_statement(
        &mut self,
        seat: Seat,
        commitments: [CardCommitment; HOLE_CARDS],
        now: DateTime<Utc>,
    ) -> Result<PublicInputs, HandError> {
        self.ensure_live(now)?;
        let result = self.check_hole_cards(seat, commitments);
        self.settle(Some(seat), now, result)
    }

    pub fn apply_hole_cards(
        &mut self,
        seat: Seat,
        commitments: [CardCommitment; HOLE_CARDS],
        verified: bool,
        now: DateTime<Utc>,
    ) -> Result<(), HandError> {
        self.ensure_live(now)?;
        let result = self
            .check_hole_cards(seat, commitments)
            .and_then(|_| verdict(verified, seat, CircuitId::HoleCards));
        if result.is_ok() {
            self.seats[seat.index()].card_commitments = Some(commitments);
            info!(hand_id = %self.id, %seat, "Hole-card commitments accepted");
            if self.seats.iter().all(|s| s.card_commitments.is_some()) {
                self.transition(Stage::PreFlop, now);
            }
        }
        self.settle(Some(seat), now, result)
    }

    fn check_hole_cards(
        &self,
        seat: Seat,
        commitments: [CardCommitment; HOLE_CARDS],
    ) -> Result<PublicInputs, HandError> {
        let deck_seed = self.require_submission_stage(seat, Stage::CardCommit, "hole-card commitment")?;
        if self.seats[seat.index()].card_commitments.is_some() {
            return Err(HandError::DuplicateCardCommit(seat));
        }
        Ok(PublicInputs::HoleCards {
            deck_seed,
            seat,
            commitments,
        })
    }

    // Community reveals

    pub fn community_statement(
        &mut self,
        seat: Seat,
        street: Street,
        cards: &[Card],
        now: DateTime<Utc>,
    ) -> Result<PublicInputs, HandError> {
        self.ensure_live(now)?;
        let result = self.check_community(seat, street, cards);
        self.settle(Some(seat), now, result)
    }

    pub fn apply_community(
        &mut self,
        seat: Seat,
        street: Street,
        cards: &[Card],
        verified: bool,
        now: DateTime<Utc>,
    ) -> Result<(), HandError> {
        self.ensure_live(now)?;
        let result = self
            .check_community(seat, street, cards)
            .and_then(|_| verdict(verified, seat, CircuitId::CommunityReveal));
        if result.is_ok() {
            self.community.extend_from_slice(cards);
            info!(hand_id = %self.id, ?street, ?cards, "Board cards revealed");
            // The betting deadline starts once the board is out
            self.refresh_deadline(now);
        }
        self.settle(Some(seat), now, result)
    }

    fn check_community(
        &self,
        seat: Seat,
        street: Street,
        cards: &[Card],
    ) -> Result<PublicInputs, HandError> {
        let out_of_order = HandError::OutOfOrder {
            seat,
            operation: "community reveal",
            stage: self.stage,
        };
        let current = self.stage.street().ok_or_else(|| out_of_order.clone())?;
        let deck_seed = self.seeds.deck_seed().copied().ok_or(out_of_order)?;

        if street.board_offset() + street.card_count() <= self.community.len() {
            return Err(HandError::StreetAlreadyRevealed(street));
        }
        if street != current {
            return Err(HandError::RevealOutOfOrder {
                expected: current,
                actual: street,
            });
        }
        if cards.len() != street.card_count() {
            return Err(HandError::WrongRevealCount {
                street,
                expected: street.card_count(),
                actual: cards.len(),
            });
        }

        Ok(PublicInputs::CommunityReveal {
            deck_seed,
            street,
            cards: cards.to_vec(),
        })
    }

    // Showdown

    pub fn showdown_statement(
        &mut self,
        seat: Seat,
        score: u64,
        now: DateTime<Utc>,
    ) -> Result<PublicInputs, HandError> {
        self.ensure_live(now)?;
        let result = self.check_showdown(seat, score).map(|(_, public)| public);
        self.settle(Some(seat), now, result)
    }

    pub fn apply_showdown(
        &mut self,
        seat: Seat,
        score: u64,
        verified: bool,
        now: DateTime<Utc>,
    ) -> Result<(), HandError> {
        self.ensure_live(now)?;
        let result = self.check_showdown(seat, score).and_then(|(rank, _)| {
            verdict(verified, seat, CircuitId::HandReveal).map(|_| rank)
        });
        let result = match result {
            Ok(rank) => {
                self.seats[seat.index()].hand_rank = Some(rank);
                info!(hand_id = %self.id, %seat, category = ?rank.category, score, "Hand revealed");
                self.try_resolve_showdown(now);
                Ok(())
            }
            Err(err) => Err(err),
        };
        self.settle(Some(seat), now, result)
    }

    fn check_showdown(&self, seat: Seat, score: u64) -> Result<(HandRank, PublicInputs), HandError> {
        let out_of_order = HandError::OutOfOrder {
            seat,
            operation: "showdown reveal",
            stage: self.stage,
        };
        if self.stage != Stage::Showdown {
            return Err(out_of_order);
        }
        let state = &self.seats[seat.index()];
        if state.hand_rank.is_some() {
            return Err(HandError::DuplicateHandReveal(seat));
        }
        let rank = HandRank::from_score(score).ok_or(HandError::InvalidScore(score))?;
        let commitments = state.card_commitments.ok_or_else(|| out_of_order.clone())?;
        let board: [Card; BOARD_CARDS] = self
            .community
            .as_slice()
            .try_into()
            .map_err(|_| out_of_order)?;

        Ok((
            rank,
            PublicInputs::HandReveal {
                commitments,
                board,
                score,
            },
        ))
    }

    fn try_resolve_showdown(&mut self, now: DateTime<Utc>) {
        let all_revealed = self
            .seats
            .iter()
            .all(|s| s.folded || s.hand_rank.is_some());
        if !all_revealed {
            return;
        }
        let entries = Seat::all()
            .map(|seat| (seat, self.seats[seat.index()].hand_rank));
        if let Some(result) = showdown::resolve(entries) {
            info!(
                hand_id = %self.id,
                winners = ?result.winners,
                category = ?result.best.category,
                "Showdown resolved"
            );
            self.finish_won(result.winners, Resolution::Showdown, now);
        }
    }

    // Betting layer

    /// Close the current street's betting round and move to the next stage.
    pub fn close_betting_round(&mut self, now: DateTime<Utc>) -> Result<Stage, HandError> {
        self.ensure_live(now)?;
        let invalid = HandError::InvalidStage {
            operation: "close betting round",
            stage: self.stage,
        };
        let next = self.stage.next_betting_stage().ok_or(invalid)?;
        if let Some(street) = self.stage.street().filter(|_| self.reveal_pending()) {
            return Err(HandError::RevealPending(street));
        }

        self.to_act = None;
        self.transition(next, now);
        Ok(next)
    }

    pub fn fold(&mut self, seat: Seat, now: DateTime<Utc>) -> Result<(), HandError> {
        self.ensure_live(now)?;
        self.require_betting_stage("fold")?;

        self.seats[seat.index()].folded = true;
        info!(hand_id = %self.id, %seat, stage = %self.stage, "Seat folded");
        self.finish_won(vec![seat.other()], Resolution::Fold, now);
        Ok(())
    }

    /// Name the seat whose betting action the deadline now applies to.
    pub fn set_to_act(&mut self, seat: Seat, now: DateTime<Utc>) -> Result<(), HandError> {
        self.ensure_live(now)?;
        self.require_betting_stage("set acting seat")?;

        self.to_act = Some(seat);
        self.refresh_deadline(now);
        debug!(hand_id = %self.id, %seat, "Seat to act");
        Ok(())
    }

    // Deadlines

    /// Resolve an overdue hand. Returns false if the deadline has not passed.
    ///
    /// A single late seat forfeits to the other. Anything else (both late,
    /// or nobody to blame such as a pending board reveal) aborts.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_overdue(now) {
            return false;
        }
        let stage = self.stage;
        match self.late_seats().as_slice() {
            [seat] => {
                warn!(hand_id = %self.id, %stage, %seat, "Deadline expired, seat forfeits");
                self.finish_won(vec![seat.other()], Resolution::Forfeit, now);
            }
            late => {
                warn!(hand_id = %self.id, %stage, ?late, "Deadline expired, aborting hand");
                self.abort(AbortReason::Timeout { stage }, now);
            }
        }
        true
    }

    fn late_seats(&self) -> Vec<Seat> {
        let seats = Seat::all().into_iter();
        match self.stage {
            Stage::SeedCommit => seats.filter(|s| !self.seeds.is_committed(*s)).collect(),
            Stage::SeedReveal => seats.filter(|s| !self.seeds.is_revealed(*s)).collect(),
            Stage::CardCommit => seats
                .filter(|s| self.seats[s.index()].card_commitments.is_none())
                .collect(),
            Stage::PreFlop | Stage::Flop | Stage::Turn | Stage::River => {
                if self.reveal_pending() {
                    Vec::new()
                } else {
                    self.to_act.into_iter().collect()
                }
            }
            Stage::Showdown => seats
                .filter(|s| {
                    let state = &self.seats[s.index()];
                    !state.folded && state.hand_rank.is_none()
                })
                .collect(),
            Stage::Waiting | Stage::Completed | Stage::Aborted => Vec::new(),
        }
    }

    // Internals

    fn ensure_live(&mut self, now: DateTime<Utc>) -> Result<(), HandError> {
        if self.is_finished() {
            return Err(HandError::HandFinished);
        }
        if self.is_overdue(now) {
            let stage = self.stage;
            self.expire(now);
            return Err(HandError::DeadlineExpired(stage));
        }
        Ok(())
    }

    fn require_stage(&self, stage: Stage, operation: &'static str) -> Result<(), HandError> {
        if self.stage != stage {
            return Err(HandError::InvalidStage {
                operation,
                stage: self.stage,
            });
        }
        Ok(())
    }

    fn require_betting_stage(&self, operation: &'static str) -> Result<(), HandError> {
        if !self.stage.is_betting_stage() {
            return Err(HandError::InvalidStage {
                operation,
                stage: self.stage,
            });
        }
        Ok(())
    }

    fn require_seed_stage(&self, seat: Seat, operation: &'static str) -> Result<(), HandError> {
        match self.stage {
            Stage::SeedCommit | Stage::SeedReveal => Ok(()),
            stage => Err(HandError::OutOfOrder {
                seat,
                operation,
                stage,
            }),
        }
    }

    fn require_submission_stage(
        &self,
        seat: Seat,
        stage: Stage,
        operation: &'static str,
    ) -> Result<DeckSeed, HandError> {
        let out_of_order = HandError::OutOfOrder {
            seat,
            operation,
            stage: self.stage,
        };
        if self.stage != stage {
            return Err(out_of_order);
        }
        self.seeds.deck_seed().copied().ok_or(out_of_order)
    }

    /// Apply the abort policy to a failed submission.
    fn settle<T>(
        &mut self,
        seat: Option<Seat>,
        now: DateTime<Utc>,
        result: Result<T, HandError>,
    ) -> Result<T, HandError> {
        if let Err(err) = &result {
            match err {
                HandError::ProofRejected { seat, circuit } => {
                    warn!(hand_id = %self.id, %seat, ?circuit, "Proof rejected");
                    self.abort(
                        AbortReason::ProofRejected {
                            seat: *seat,
                            circuit: *circuit,
                        },
                        now,
                    );
                }
                err if err.kind() == ErrorKind::Violation => {
                    warn!(hand_id = %self.id, ?seat, error = %err, "Protocol violation");
                    self.abort(
                        AbortReason::Violation {
                            seat,
                            detail: err.to_string(),
                        },
                        now,
                    );
                }
                _ => {}
            }
        }
        result
    }

    fn refresh_deadline(&mut self, now: DateTime<Utc>) {
        self.deadline = self
            .timeouts
            .for_stage(self.stage, self.reveal_pending())
            .map(|timeout| now + chrono_duration(timeout));
    }

    fn transition(&mut self, to: Stage, now: DateTime<Utc>) {
        let from = self.stage;
        self.stage = to;
        self.refresh_deadline(now);
        info!(hand_id = %self.id, %from, %to, "Stage changed");
        self.outbox.push(HandEvent::StageChanged {
            hand_id: self.id,
            from,
            to,
        });
    }

    fn finish_won(&mut self, winners: Vec<Seat>, resolution: Resolution, now: DateTime<Utc>) {
        let split_ways = winners.len() as u8;
        let best = winners
            .first()
            .and_then(|seat| self.seats[seat.index()].hand_rank);
        self.transition(Stage::Completed, now);
        for seat in &winners {
            self.outbox.push(HandEvent::PotAwarded {
                hand_id: self.id,
                seat: *seat,
                split_ways,
            });
        }
        self.outcome = Some(HandOutcome::Won {
            winners,
            resolution,
            best,
        });
    }

    fn abort(&mut self, reason: AbortReason, now: DateTime<Utc>) {
        if self.is_finished() {
            return;
        }
        self.transition(Stage::Aborted, now);
        self.outbox.push(HandEvent::HandAborted {
            hand_id: self.id,
            reason: reason.clone(),
        });
        self.outcome = Some(HandOutcome::Aborted { reason });
    }
}
