use crate::hand::{AbortReason, Stage};
use prover::Seat;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Notifications for the escrow/ledger collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandEvent {
    HandStarted {
        hand_id: Uuid,
    },
    StageChanged {
        hand_id: Uuid,
        from: Stage,
        to: Stage,
    },
    /// One per winning seat. `split_ways` is the number of seats sharing the pot.
    PotAwarded {
        hand_id: Uuid,
        seat: Seat,
        split_ways: u8,
    },
    HandAborted {
        hand_id: Uuid,
        reason: AbortReason,
    },
}

impl HandEvent {
    pub fn hand_id(&self) -> Uuid {
        match self {
            HandEvent::HandStarted { hand_id }
            | HandEvent::StageChanged { hand_id, .. }
            | HandEvent::PotAwarded { hand_id, .. }
            | HandEvent::HandAborted { hand_id, .. } => *hand_id,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<HandEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<HandEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
