//! DTOs for the sessions_sea adapter.

use sea_orm::entity::prelude::Json;
use time::OffsetDateTime;

use crate::entities::game_sessions::SessionStatus;

/// Insert payload for a new waiting session.
#[derive(Debug, Clone)]
pub struct SessionCreate {
    pub code: String,
    pub host_id: String,
    pub mode: String,
    pub total_rounds: i32,
    pub max_players: i32,
    pub players: Json,
    pub created_at: OffsetDateTime,
}

/// Full-row rewrite guarded by `expected_version`.
///
/// Sessions are stored as one document, so every mutation writes all mutable
/// columns at once and bumps `lock_version` by one.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub id: i64,
    pub expected_version: i32,
    pub host_id: String,
    pub status: SessionStatus,
    pub current_round: i32,
    pub total_rounds: i32,
    pub players: Json,
    pub chains: Json,
    pub ended_at: Option<OffsetDateTime>,
}
