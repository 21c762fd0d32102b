//! Single-slot, latest-value-wins position queue
//!
//! Producers (the uevent thread) overwrite the slot without blocking; the
//! one consumer task suspends until a value is present. A burst published
//! before the consumer wakes collapses to its last value.

use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::trace;

use crate::policy::Position;

#[derive(Debug, Default)]
struct Slot {
    pending: Option<Position>,
    closed: bool,
}

/// Overwrite queue between hardware notifications and the policy worker
#[derive(Debug, Default)]
pub struct PositionQueue {
    slot: Mutex<Slot>,
    ready: Notify,
}

impl PositionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any unconsumed position with `position`
    pub fn publish(&self, position: Position) {
        {
            let mut slot = self.lock();
            if slot.closed {
                return;
            }
            if let Some(superseded) = slot.pending.replace(position) {
                trace!(%superseded, %position, "pending position superseded");
            }
        }
        self.ready.notify_one();
    }

    /// Wait for the next position; `None` once the queue is closed and drained
    pub async fn consume(&self) -> Option<Position> {
        loop {
            {
                let mut slot = self.lock();
                if let Some(position) = slot.pending.take() {
                    return Some(position);
                }
                if slot.closed {
                    return None;
                }
            }
            // notify_one stores a permit when nobody waits, so a publish
            // between the check above and this await is not lost.
            self.ready.notified().await;
        }
    }

    /// Stop accepting positions and wake the consumer
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_one();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        // The slot holds plain data, so a poisoned lock is still consistent.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
