use crate::config::DEFAULT_ARCHIVE_CAPACITY;
use crate::hand::{HandOutcome, HandView};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedHand {
    pub view: HandView,
    pub finished_at: DateTime<Utc>,
}

impl ArchivedHand {
    pub fn outcome(&self) -> Option<&HandOutcome> {
        self.view.outcome.as_ref()
    }
}

/// In-memory store of finished hands, bounded. Once full, storing a hand
/// evicts the one archived longest ago.
pub struct Archive {
    hands: DashMap<Uuid, ArchivedHand>,
    order: Mutex<VecDeque<Uuid>>,
    capacity: usize,
}

impl Default for Archive {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_ARCHIVE_CAPACITY)
    }
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hands: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn store(&self, view: HandView, finished_at: DateTime<Utc>) {
        let mut order = self.order.lock();
        let id = view.id;
        if self
            .hands
            .insert(id, ArchivedHand { view, finished_at })
            .is_none()
        {
            order.push_back(id);
        }

        while order.len() > self.capacity {
            if let Some(evicted) = order.pop_front() {
                self.hands.remove(&evicted);
                debug!(hand_id = %evicted, "Evicted archived hand");
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<ArchivedHand> {
        self.hands.get(id).map(|hand| hand.clone())
    }

    /// Most recently finished first.
    pub fn recent(&self, limit: usize) -> Vec<ArchivedHand> {
        let mut hands: Vec<ArchivedHand> = self
            .hands
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        hands.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
        hands.truncate(limit);
        hands
    }

    pub fn len(&self) -> usize {
        self.hands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageTimeouts;
    use crate::hand::HandState;
    use chrono::Duration;

    #[test]
    fn test_recent_orders_by_finish_time() {
        let archive = Archive::new();
        let t0 = Utc::now();
        let mut ids = Vec::new();
        for i in 0..3 {
            let hand = HandState::new(Uuid::new_v4(), StageTimeouts::default(), t0);
            ids.push(hand.id());
            archive.store(hand.view(), t0 + Duration::seconds(i));
        }

        let recent = archive.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].view.id, ids[2]);
        assert_eq!(recent[1].view.id, ids[1]);
        assert!(archive.get(&ids[0]).is_some());
        assert!(archive.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_full_archive_evicts_oldest_first() {
        let archive = Archive::with_capacity(2);
        let t0 = Utc::now();
        let ids: Vec<Uuid> = (0..3)
            .map(|i| {
                let hand = HandState::new(Uuid::new_v4(), StageTimeouts::default(), t0);
                archive.store(hand.view(), t0 + Duration::seconds(i));
                hand.id()
            })
            .collect();

        assert_eq!(archive.len(), 2);
        assert!(archive.get(&ids[0]).is_none());
        assert!(archive.get(&ids[1]).is_some());
        assert!(archive.get(&ids[2]).is_some());

        // Storing the same hand again does not push anything out
        let again = archive.get(&ids[2]).unwrap();
        archive.store(again.view, again.finished_at);
        assert_eq!(archive.len(), 2);
        assert!(archive.get(&ids[1]).is_some());
    }
}
