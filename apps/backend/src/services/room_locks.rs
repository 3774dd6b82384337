//! In-process writer lock per session code.
//!
//! Mutations for one room queue here before opening a transaction, so a
//! burst of submits commits one after another instead of racing on the
//! version column. Entries are dropped once no task holds or awaits them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct RoomLocks {
    rooms: DashMap<String, Arc<Mutex<()>>>,
}

/// Held for the duration of one mutation; releases the room on drop.
pub struct RoomGuard<'a> {
    locks: &'a RoomLocks,
    code: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, code: &str) -> RoomGuard<'_> {
        let lock = self.rooms.entry(code.to_string()).or_default().clone();
        let guard = lock.lock_owned().await;
        RoomGuard {
            locks: self,
            code: code.to_string(),
            guard: Some(guard),
        }
    }

    /// Rooms with a holder or waiter.
    pub fn active(&self) -> usize {
        self.rooms.len()
    }
}

impl Drop for RoomGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Count 1 means only the map still references the mutex.
        self.locks
            .rooms
            .remove_if(&self.code, |_, lock| Arc::strong_count(lock) == 1);
    }
}
