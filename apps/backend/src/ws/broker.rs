use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::ws::hub::WsRegistry;
use crate::ws::protocol::RoomEvent;
use crate::ws::session::HubEvent;

/// In-process fan-out of room events to the websocket connections bound to
/// each room. Delivery is fire-and-forget: a room with nobody connected is
/// not an error.
pub struct RealtimeBroker {
    registry: Arc<WsRegistry>,
}

impl RealtimeBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            registry: Arc::new(WsRegistry::new()),
        })
    }

    pub fn registry(&self) -> Arc<WsRegistry> {
        self.registry.clone()
    }

    /// Publish to everyone in the room `code`.
    pub fn publish(&self, code: &str, event: &RoomEvent) {
        let Some(frame) = encode(event) else {
            return;
        };
        let delivered = self.registry.broadcast_room(code, HubEvent::Frame(frame));
        debug!(code, event = event.name(), delivered, "room event published");
    }

    /// Publish to everyone in the room except `sender`.
    pub fn publish_except(&self, code: &str, sender: Uuid, event: &RoomEvent) {
        let Some(frame) = encode(event) else {
            return;
        };
        let delivered = self
            .registry
            .broadcast_room_except(code, sender, HubEvent::Frame(frame));
        debug!(code, event = event.name(), %sender, delivered, "room event relayed");
    }

    pub fn publish_all(&self, code: &str, events: &[RoomEvent]) {
        for event in events {
            self.publish(code, event);
        }
    }
}

fn encode(event: &RoomEvent) -> Option<Arc<str>> {
    match serde_json::to_string(event) {
        Ok(payload) => Some(Arc::from(payload)),
        Err(err) => {
            warn!(error = %err, event = event.name(), "failed to serialize room event");
            None
        }
    }
}
