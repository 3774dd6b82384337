use std::collections::HashSet;

use actix::prelude::*;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::ws::session::HubEvent;

/// `(room code, lowercased nickname)`; codes are already uppercase.
pub type IdentityKey = (String, String);

pub fn identity_key(code: &str, nickname: &str) -> IdentityKey {
    (code.to_string(), nickname.trim().to_lowercase())
}

/// Room membership of one bound connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub code: String,
    pub nickname: String,
}

/// Result of dropping a connection's binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unbound {
    pub binding: Binding,
    /// False when a newer connection had already taken over the identity.
    pub was_owner: bool,
}

/// Live websocket connections, their room membership, and the
/// identity -> connection map used to tell reconnects from departures.
#[derive(Default)]
pub struct WsRegistry {
    connections: DashMap<Uuid, Recipient<HubEvent>>,
    rooms: DashMap<String, HashSet<Uuid>>,
    bindings: DashMap<Uuid, Binding>,
    identities: DashMap<IdentityKey, Uuid>,
}

impl WsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_connection(&self, conn_id: Uuid, recipient: Recipient<HubEvent>) {
        self.connections.insert(conn_id, recipient);
    }

    /// Forget the connection entirely. Returns its binding, if it had one.
    pub fn unregister_connection(&self, conn_id: Uuid) -> Option<Unbound> {
        let unbound = self.unbind(conn_id);
        self.connections.remove(&conn_id);
        unbound
    }

    /// Bind `conn_id` to `(code, nickname)`, replacing any earlier owner of
    /// that identity. Returns the connection that was displaced, if any.
    pub fn bind(&self, conn_id: Uuid, code: &str, nickname: &str) -> Option<Uuid> {
        if let Some(existing) = self.bindings.get(&conn_id).map(|b| b.clone()) {
            if identity_key(code, nickname) == identity_key(&existing.code, &existing.nickname) {
                return None;
            }
            self.unbind(conn_id);
        }

        self.bindings.insert(
            conn_id,
            Binding {
                code: code.to_string(),
                nickname: nickname.to_string(),
            },
        );
        self.rooms
            .entry(code.to_string())
            .or_default()
            .insert(conn_id);

        let displaced = self
            .identities
            .insert(identity_key(code, nickname), conn_id)
            .filter(|prev| *prev != conn_id);
        if let Some(prev) = displaced {
            debug!(code, nickname, %prev, %conn_id, "identity rebound to new connection");
        }
        displaced
    }

    /// Drop the connection's room binding. The identity mapping is removed
    /// only if this connection still owns it.
    pub fn unbind(&self, conn_id: Uuid) -> Option<Unbound> {
        let (_, binding) = self.bindings.remove(&conn_id)?;

        if let Some(mut members) = self.rooms.get_mut(&binding.code) {
            members.remove(&conn_id);
        }
        self.rooms
            .remove_if(&binding.code, |_, members| members.is_empty());

        let was_owner = self
            .identities
            .remove_if(&identity_key(&binding.code, &binding.nickname), |_, owner| {
                *owner == conn_id
            })
            .is_some();

        Some(Unbound { binding, was_owner })
    }

    pub fn binding(&self, conn_id: Uuid) -> Option<Binding> {
        self.bindings.get(&conn_id).map(|b| b.clone())
    }

    pub fn owner_of(&self, code: &str, nickname: &str) -> Option<Uuid> {
        self.identities
            .get(&identity_key(code, nickname))
            .map(|owner| *owner)
    }

    pub fn room_size(&self, code: &str) -> usize {
        self.rooms.get(code).map(|m| m.len()).unwrap_or(0)
    }

    fn recipients(&self, code: &str, except: Option<Uuid>) -> Vec<Recipient<HubEvent>> {
        let Some(members) = self.rooms.get(code) else {
            return Vec::new();
        };
        members
            .iter()
            .filter(|id| Some(**id) != except)
            .filter_map(|id| self.connections.get(id).map(|r| r.clone()))
            .collect()
    }

    /// Deliver to every connection in the room. Returns the number reached.
    pub fn broadcast_room(&self, code: &str, event: HubEvent) -> usize {
        self.send_all(self.recipients(code, None), event)
    }

    pub fn broadcast_room_except(&self, code: &str, except: Uuid, event: HubEvent) -> usize {
        self.send_all(self.recipients(code, Some(except)), event)
    }

    fn send_all(&self, recipients: Vec<Recipient<HubEvent>>, event: HubEvent) -> usize {
        let count = recipients.len();
        for recipient in recipients {
            recipient.do_send(event.clone());
        }
        count
    }
}
