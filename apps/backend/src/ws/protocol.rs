use serde::{Deserialize, Serialize};

use crate::domain::session::GameSession;

pub const PROTOCOL_VERSION: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    Hello {
        protocol: i32,
    },
    /// Bind this connection to a roster member of the room `code`.
    JoinRoom {
        code: String,
        nickname: String,
    },
    LeaveRoom,
    RevealNext {
        #[serde(rename = "chainIndex")]
        chain_index: usize,
        #[serde(rename = "entryIndex")]
        entry_index: usize,
    },
    RevealReset,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    HelloAck {
        protocol: i32,
        conn_id: String,
    },
    Joined {
        code: String,
        nickname: String,
        session: GameSession,
    },
    Ack {
        message: &'static str,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadProtocol,
    BadRequest,
    NotInRoom,
    JoinRejected,
}

/// Events fanned out to everyone in a room. The `type` tag carries the
/// event name clients listen for.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum RoomEvent {
    PlayerJoined {
        code: String,
        nickname: String,
        session: GameSession,
    },
    /// `session` is absent when the departure emptied and deleted the room.
    PlayerLeft {
        code: String,
        nickname: String,
        new_host: Option<String>,
        session: Option<GameSession>,
    },
    GameStarted {
        code: String,
        session: GameSession,
    },
    PlayerSubmitted {
        code: String,
        nickname: String,
        round: u32,
        submitted_count: usize,
        total_players: usize,
    },
    NextRound {
        code: String,
        round: u32,
        session: GameSession,
    },
    GameEnded {
        code: String,
        session: GameSession,
    },
    RevealNext {
        code: String,
        chain_index: usize,
        entry_index: usize,
    },
    RevealReset {
        code: String,
    },
}

impl RoomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::PlayerJoined { .. } => "player-joined",
            RoomEvent::PlayerLeft { .. } => "player-left",
            RoomEvent::GameStarted { .. } => "game-started",
            RoomEvent::PlayerSubmitted { .. } => "player-submitted",
            RoomEvent::NextRound { .. } => "next-round",
            RoomEvent::GameEnded { .. } => "game-ended",
            RoomEvent::RevealNext { .. } => "reveal-next",
            RoomEvent::RevealReset { .. } => "reveal-reset",
        }
    }
}
