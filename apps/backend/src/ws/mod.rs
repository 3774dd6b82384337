//! Websocket transport: wire protocol, connection registry, room fan-out
//! and the per-connection actor.

pub mod broker;
pub mod hub;
pub mod protocol;
pub mod session;
