//! Grace-period timers that turn a dropped websocket into a departure.
//!
//! Each `(code, nickname)` owns at most one pending timer. Arming again
//! cancels and replaces the previous one; a rejoin cancels it outright.
//! An identity that is bound to a live socket again when its timer fires
//! keeps its seat, even if the rejoin raced the expiry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::domain::DomainError;
use crate::services::sessions::SessionCoordinator;
use crate::ws::hub::{identity_key, IdentityKey, WsRegistry};

struct PendingDeparture {
    generation: u64,
    cancel: CancellationToken,
}

pub struct DisconnectSupervisor {
    grace: Duration,
    coordinator: SessionCoordinator,
    registry: Arc<WsRegistry>,
    timers: DashMap<IdentityKey, PendingDeparture>,
    generation: AtomicU64,
}

impl DisconnectSupervisor {
    pub fn new(
        coordinator: SessionCoordinator,
        registry: Arc<WsRegistry>,
        grace: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            grace,
            coordinator,
            registry,
            timers: DashMap::new(),
            generation: AtomicU64::new(0),
        })
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Start (or restart) the grace timer for `nickname` in room `code`.
    pub fn arm(self: &Arc<Self>, code: &str, nickname: &str) {
        let key = identity_key(code, nickname);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();

        if let Some(previous) = self.timers.insert(
            key.clone(),
            PendingDeparture {
                generation,
                cancel: cancel.clone(),
            },
        ) {
            previous.cancel.cancel();
        }
        debug!(code, nickname, grace_ms = self.grace.as_millis() as u64, "disconnect timer armed");

        let supervisor = Arc::clone(self);
        let code = code.to_string();
        let nickname = nickname.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(code = %code, nickname = %nickname, "disconnect timer cancelled");
                }
                _ = tokio::time::sleep(supervisor.grace) => {
                    supervisor.expire(key, generation, &code, &nickname).await;
                }
            }
        });
    }

    /// Cancel a pending timer. Returns true if one was pending.
    pub fn cancel(&self, code: &str, nickname: &str) -> bool {
        match self.timers.remove(&identity_key(code, nickname)) {
            Some((_, pending)) => {
                pending.cancel.cancel();
                debug!(code, nickname, "player reconnected within grace period");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, code: &str, nickname: &str) -> bool {
        self.timers.contains_key(&identity_key(code, nickname))
    }

    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }

    /// Cancel every pending timer without running departures.
    pub fn shutdown(&self) {
        for entry in self.timers.iter() {
            entry.value().cancel.cancel();
        }
        self.timers.clear();
    }

    async fn expire(&self, key: IdentityKey, generation: u64, code: &str, nickname: &str) {
        // A newer timer for the same identity owns the entry now.
        let owned = self
            .timers
            .remove_if(&key, |_, pending| pending.generation == generation)
            .is_some();
        if !owned {
            return;
        }

        if self.registry.owner_of(code, nickname).is_some() {
            debug!(code, nickname, "grace period expired but identity is bound again");
            return;
        }

        let registry = Arc::clone(&self.registry);
        let (bound_code, bound_nickname) = (code.to_string(), nickname.to_string());
        let rebound = move || registry.owner_of(&bound_code, &bound_nickname).is_some();

        match self.coordinator.leave_if_gone(code, nickname, rebound).await {
            Ok(left) => info!(code, nickname, outcome = left.message, "grace period expired"),
            Err(DomainError::NotFound(..)) => {
                debug!(code, nickname, "grace period expired for a player no longer in the room")
            }
            Err(err) => warn!(code, nickname, error = %err, "departure after grace period failed"),
        }
    }
}
