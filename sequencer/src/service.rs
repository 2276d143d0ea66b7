//! Concurrent registry of live hands.
//!
//! Each hand sits behind its own mutex and is only locked for short
//! validate-or-apply steps. Proof verification runs on the blocking pool with
//! no lock held, so other requests for the same hand (views, polling) are
//! never stuck behind a slow proof.

use crate::archive::Archive;
use crate::config::ServiceConfig;
use crate::events::EventSender;
use crate::hand::{HandError, HandState, HandView};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use prover::layout::HOLE_CARDS;
use prover::{
    Card, CardCommitment, ProofBytes, ProofError, ProofOracle, PublicInputs, Seat, Seed,
    SeedCommitment, Street,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Hand not found: {0}")]
    HandNotFound(Uuid),
    #[error(transparent)]
    Hand(#[from] HandError),
    #[error("Proof verification timed out after {0:?}")]
    ProofTimeout(Duration),
    #[error("Proof backend failed: {0}")]
    Oracle(ProofError),
    #[error("Verification task failed: {0}")]
    VerifierTask(String),
}

type SharedHand = Arc<Mutex<HandState>>;

pub struct HandService {
    hands: DashMap<Uuid, SharedHand>,
    archive: Archive,
    oracle: Arc<dyn ProofOracle>,
    config: ServiceConfig,
    events: EventSender,
}

impl HandService {
    pub fn new(config: ServiceConfig, oracle: Arc<dyn ProofOracle>, events: EventSender) -> Self {
        Self {
            hands: DashMap::new(),
            archive: Archive::with_capacity(config.archive_capacity),
            oracle,
            config,
            events,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn live_hands(&self) -> usize {
        self.hands.len()
    }

    pub fn create_hand(&self) -> HandView {
        let id = Uuid::new_v4();
        let hand = HandState::new(id, self.config.timeouts, Utc::now());
        let view = hand.view();
        self.hands.insert(id, Arc::new(Mutex::new(hand)));
        info!(hand_id = %id, "Hand created");
        view
    }

    /// Current view of a live hand, or the final view of an archived one.
    pub fn hand_view(&self, id: Uuid) -> Result<HandView, ServiceError> {
        if let Some(hand) = self.live(id) {
            return Ok(hand.lock().view());
        }
        self.archive
            .get(&id)
            .map(|archived| archived.view)
            .ok_or(ServiceError::HandNotFound(id))
    }

    pub fn bond_seat(&self, id: Uuid, seat: Seat) -> Result<HandView, ServiceError> {
        self.with_hand(id, |hand, now| {
            hand.bond_seat(seat, now)?;
            Ok(hand.view())
        })
    }

    pub fn start_hand(&self, id: Uuid) -> Result<HandView, ServiceError> {
        self.with_hand(id, |hand, now| {
            hand.start(now)?;
            Ok(hand.view())
        })
    }

    pub fn commit_seed(
        &self,
        id: Uuid,
        seat: Seat,
        commitment: SeedCommitment,
    ) -> Result<HandView, ServiceError> {
        self.with_hand(id, |hand, now| {
            hand.commit_seed(seat, commitment, now)?;
            Ok(hand.view())
        })
    }

    pub fn reveal_seed(&self, id: Uuid, seat: Seat, seed: Seed) -> Result<HandView, ServiceError> {
        self.with_hand(id, |hand, now| {
            hand.reveal_seed(seat, seed, now)?;
            Ok(hand.view())
        })
    }

    pub async fn submit_hole_cards(
        &self,
        id: Uuid,
        seat: Seat,
        commitments: [CardCommitment; HOLE_CARDS],
        proof: ProofBytes,
    ) -> Result<HandView, ServiceError> {
        let public = self.with_hand(id, |hand, now| {
            hand.hole_cards_statement(seat, commitments, now)
        })?;
        let verified = self.verify(public, proof).await?;
        self.with_hand(id, |hand, now| {
            hand.apply_hole_cards(seat, commitments, verified, now)?;
            Ok(hand.view())
        })
    }

    pub async fn reveal_community(
        &self,
        id: Uuid,
        seat: Seat,
        street: Street,
        cards: Vec<Card>,
        proof: ProofBytes,
    ) -> Result<HandView, ServiceError> {
        let public = self.with_hand(id, |hand, now| {
            hand.community_statement(seat, street, &cards, now)
        })?;
        let verified = self.verify(public, proof).await?;
        self.with_hand(id, |hand, now| {
            hand.apply_community(seat, street, &cards, verified, now)?;
            Ok(hand.view())
        })
    }

    pub async fn reveal_hand(
        &self,
        id: Uuid,
        seat: Seat,
        score: u64,
        proof: ProofBytes,
    ) -> Result<HandView, ServiceError> {
        let public = self.with_hand(id, |hand, now| hand.showdown_statement(seat, score, now))?;
        let verified = self.verify(public, proof).await?;
        self.with_hand(id, |hand, now| {
            hand.apply_showdown(seat, score, verified, now)?;
            Ok(hand.view())
        })
    }

    pub fn close_betting_round(&self, id: Uuid) -> Result<HandView, ServiceError> {
        self.with_hand(id, |hand, now| {
            hand.close_betting_round(now)?;
            Ok(hand.view())
        })
    }

    pub fn fold(&self, id: Uuid, seat: Seat) -> Result<HandView, ServiceError> {
        self.with_hand(id, |hand, now| {
            hand.fold(seat, now)?;
            Ok(hand.view())
        })
    }

    pub fn set_to_act(&self, id: Uuid, seat: Seat) -> Result<HandView, ServiceError> {
        self.with_hand(id, |hand, now| {
            hand.set_to_act(seat, now)?;
            Ok(hand.view())
        })
    }

    /// Resolve every hand whose deadline has passed. Returns how many expired.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        // Collect first: flushing removes entries and must not run under a shard lock
        let hands: Vec<SharedHand> = self
            .hands
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut expired = 0;
        for hand in hands {
            let mut hand = hand.lock();
            if hand.expire(now) {
                expired += 1;
            }
            self.flush(&mut hand, now);
        }
        expired
    }

    fn live(&self, id: Uuid) -> Option<SharedHand> {
        self.hands.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn with_hand<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut HandState, DateTime<Utc>) -> Result<T, HandError>,
    ) -> Result<T, ServiceError> {
        let Some(hand) = self.live(id) else {
            return Err(if self.archive.get(&id).is_some() {
                HandError::HandFinished.into()
            } else {
                ServiceError::HandNotFound(id)
            });
        };

        let mut hand = hand.lock();
        let now = Utc::now();
        let result = f(&mut hand, now);
        self.flush(&mut hand, now);
        result.map_err(ServiceError::from)
    }

    /// Publish pending events and archive the hand once it is finished.
    fn flush(&self, hand: &mut HandState, now: DateTime<Utc>) {
        for event in hand.drain_events() {
            if self.events.send(event).is_err() {
                debug!(hand_id = %hand.id(), "Event receiver dropped");
            }
        }
        if hand.is_finished() && self.hands.remove(&hand.id()).is_some() {
            self.archive.store(hand.view(), now);
            info!(hand_id = %hand.id(), stage = %hand.stage(), "Hand archived");
        }
    }

    /// Run the oracle off the async runtime, bounded by the proof timeout.
    /// Rejection-class oracle errors count as a negative verdict.
    async fn verify(&self, public: PublicInputs, proof: ProofBytes) -> Result<bool, ServiceError> {
        let oracle = Arc::clone(&self.oracle);
        let circuit = public.circuit_id();
        let task = tokio::task::spawn_blocking(move || oracle.verify(circuit, &proof, &public));

        match tokio::time::timeout(self.config.proof_timeout, task).await {
            Err(_) => {
                error!(?circuit, "Proof verification timed out");
                Err(ServiceError::ProofTimeout(self.config.proof_timeout))
            }
            Ok(Err(join_error)) => Err(ServiceError::VerifierTask(join_error.to_string())),
            Ok(Ok(Ok(verified))) => {
                debug!(?circuit, verified, "Proof verified");
                Ok(verified)
            }
            Ok(Ok(Err(err))) if err.is_rejection() => {
                debug!(?circuit, error = %err, "Proof rejected by oracle");
                Ok(false)
            }
            Ok(Ok(Err(err))) => {
                error!(?circuit, error = %err, "Proof backend error");
                Err(ServiceError::Oracle(err))
            }
        }
    }
}

/// Periodically expire overdue hands.
pub fn spawn_sweeper(service: Arc<HandService>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(service.config().sweep_interval);
        loop {
            ticker.tick().await;
            let expired = service.sweep(Utc::now());
            if expired > 0 {
                info!(expired, live = service.live_hands(), "Sweeper expired hands");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{self, HandEvent};
    use crate::hand::{AbortReason, HandOutcome, Stage};
    use assert_matches::assert_matches;
    use prover::{MockOracle, NativeOracle};

    fn service(oracle: Arc<dyn ProofOracle>) -> (HandService, events::EventReceiver) {
        let (tx, rx) = events::channel();
        (HandService::new(ServiceConfig::default(), oracle, tx), rx)
    }

    fn seeds() -> [Seed; 2] {
        [Seed::from_bytes([3u8; 32]), Seed::from_bytes([4u8; 32])]
    }

    fn seeded_hand(service: &HandService) -> Uuid {
        let id = service.create_hand().id;
        for seat in Seat::all() {
            service.bond_seat(id, seat).unwrap();
        }
        service.start_hand(id).unwrap();
        for seat in Seat::all() {
            service
                .commit_seed(id, seat, seeds()[seat.index()].commitment())
                .unwrap();
        }
        for seat in Seat::all() {
            service.reveal_seed(id, seat, seeds()[seat.index()]).unwrap();
        }
        id
    }

    #[tokio::test]
    async fn test_rejected_proof_aborts_and_archives() {
        let (service, mut rx) = service(Arc::new(MockOracle::rejecting()));
        let id = seeded_hand(&service);

        let commitments = [CardCommitment(prover::Fr::from(1u64)); HOLE_CARDS];
        let err = service
            .submit_hole_cards(id, Seat::FIRST, commitments, ProofBytes(vec![1]))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Hand(HandError::ProofRejected { .. }));

        assert_eq!(service.live_hands(), 0);
        let view = service.hand_view(id).unwrap();
        assert_eq!(view.stage, Stage::Aborted);
        assert_matches!(
            view.outcome,
            Some(HandOutcome::Aborted { reason: AbortReason::ProofRejected { .. } })
        );

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_matches!(last, Some(HandEvent::HandAborted { .. }));

        assert_matches!(
            service.fold(id, Seat::FIRST),
            Err(ServiceError::Hand(HandError::HandFinished))
        );
    }

    #[tokio::test]
    async fn test_malformed_proof_counts_as_rejection() {
        let (service, _rx) = service(Arc::new(NativeOracle::new()));
        let id = seeded_hand(&service);

        let commitments = [CardCommitment(prover::Fr::from(1u64)); HOLE_CARDS];
        let err = service
            .submit_hole_cards(id, Seat::SECOND, commitments, ProofBytes(Vec::new()))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Hand(HandError::ProofRejected { .. }));
        assert_eq!(service.hand_view(id).unwrap().stage, Stage::Aborted);
    }

    #[tokio::test]
    async fn test_accepted_proofs_advance() {
        let (service, _rx) = service(Arc::new(MockOracle::accepting()));
        let id = seeded_hand(&service);

        for seat in Seat::all() {
            let commitments = [CardCommitment(prover::Fr::from(seat.index() as u64)); HOLE_CARDS];
            service
                .submit_hole_cards(id, seat, commitments, ProofBytes(vec![1]))
                .await
                .unwrap();
        }
        assert_eq!(service.hand_view(id).unwrap().stage, Stage::PreFlop);
    }

    #[test]
    fn test_unknown_hand() {
        let (service, _rx) = service(Arc::new(MockOracle::accepting()));
        let id = Uuid::new_v4();
        assert_matches!(service.hand_view(id), Err(ServiceError::HandNotFound(_)));
        assert_matches!(service.start_hand(id), Err(ServiceError::HandNotFound(_)));
        assert_matches!(
            tokio_test::block_on(service.reveal_hand(id, Seat::FIRST, 0, ProofBytes(vec![1]))),
            Err(ServiceError::HandNotFound(_))
        );
    }

    #[test]
    fn test_sweep_expires_overdue_hands() {
        let (service, _rx) = service(Arc::new(MockOracle::accepting()));
        let stale = service.create_hand().id;
        let fresh = service.create_hand().id;
        for seat in Seat::all() {
            service.bond_seat(fresh, seat).unwrap();
        }

        assert_eq!(service.sweep(Utc::now()), 0);
        let later = Utc::now() + chrono::Duration::seconds(120);
        assert_eq!(service.sweep(later), 2);
        assert_eq!(service.live_hands(), 0);
        assert_eq!(service.archive().len(), 2);
        assert_eq!(service.hand_view(stale).unwrap().stage, Stage::Aborted);
    }
}
