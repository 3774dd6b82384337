//! Session repository: maps rows to the `GameSession` aggregate and back.

use sea_orm::ConnectionTrait;
use time::OffsetDateTime;

use crate::adapters::sessions_sea as sessions_adapter;
use crate::domain::session::{Chain, GameSession, Player, SessionStatus};
use crate::entities::game_sessions;
use crate::errors::domain::{DomainError, InfraErrorKind};

impl From<SessionStatus> for game_sessions::SessionStatus {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Waiting => game_sessions::SessionStatus::Waiting,
            SessionStatus::InProgress => game_sessions::SessionStatus::InProgress,
            SessionStatus::Finished => game_sessions::SessionStatus::Finished,
        }
    }
}

impl From<game_sessions::SessionStatus> for SessionStatus {
    fn from(status: game_sessions::SessionStatus) -> Self {
        match status {
            game_sessions::SessionStatus::Waiting => SessionStatus::Waiting,
            game_sessions::SessionStatus::InProgress => SessionStatus::InProgress,
            game_sessions::SessionStatus::Finished => SessionStatus::Finished,
        }
    }
}

fn corrupt(code: &str, what: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::infra(
        InfraErrorKind::DataCorruption,
        format!("session {code}: unreadable {what}: {e}"),
    )
}

fn to_json<T: serde::Serialize>(code: &str, what: &str, value: &T) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(value).map_err(|e| corrupt(code, what, e))
}

fn non_negative(code: &str, what: &str, value: i32) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|e| corrupt(code, what, e))
}

impl TryFrom<game_sessions::Model> for GameSession {
    type Error = DomainError;

    fn try_from(row: game_sessions::Model) -> Result<Self, Self::Error> {
        let players: Vec<Player> =
            serde_json::from_value(row.players).map_err(|e| corrupt(&row.code, "players", e))?;
        let chains: Vec<Chain> =
            serde_json::from_value(row.chains).map_err(|e| corrupt(&row.code, "chains", e))?;
        Ok(GameSession {
            id: row.id,
            current_round: non_negative(&row.code, "current_round", row.current_round)?,
            total_rounds: non_negative(&row.code, "total_rounds", row.total_rounds)?,
            max_players: non_negative(&row.code, "max_players", row.max_players)?,
            code: row.code,
            host_id: row.host_id,
            status: row.status.into(),
            mode: row.mode,
            players,
            chains,
            created_at: row.created_at,
            ended_at: row.ended_at,
            version: row.lock_version,
        })
    }
}

pub async fn find_by_code<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    code: &str,
) -> Result<Option<GameSession>, DomainError> {
    sessions_adapter::find_by_code(conn, code)
        .await?
        .map(GameSession::try_from)
        .transpose()
}

/// Find by code or return `NotFound(Session)`.
pub async fn require_session<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    code: &str,
) -> Result<GameSession, DomainError> {
    find_by_code(conn, code)
        .await?
        .ok_or_else(|| DomainError::session_not_found(code))
}

/// Like `require_session`, but locks the row for the rest of the transaction.
pub async fn lock_session<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    code: &str,
) -> Result<GameSession, DomainError> {
    sessions_adapter::find_by_code_for_update(conn, code)
        .await?
        .map(GameSession::try_from)
        .transpose()?
        .ok_or_else(|| DomainError::session_not_found(code))
}

pub async fn code_exists<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    code: &str,
) -> Result<bool, DomainError> {
    Ok(sessions_adapter::code_exists(conn, code).await?)
}

/// Insert a freshly built waiting session.
pub async fn create<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    session: &GameSession,
) -> Result<GameSession, DomainError> {
    let dto = sessions_adapter::SessionCreate {
        code: session.code.clone(),
        host_id: session.host_id.clone(),
        mode: session.mode.clone(),
        total_rounds: session.total_rounds as i32,
        max_players: session.max_players as i32,
        players: to_json(&session.code, "players", &session.players)?,
        created_at: session.created_at,
    };
    let row = sessions_adapter::create_session(conn, dto).await?;
    GameSession::try_from(row)
}

/// Persist `session` if nobody else wrote since it was loaded.
pub async fn save<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    session: &GameSession,
) -> Result<GameSession, DomainError> {
    let dto = sessions_adapter::SessionUpdate {
        id: session.id,
        expected_version: session.version,
        host_id: session.host_id.clone(),
        status: session.status.into(),
        current_round: session.current_round as i32,
        total_rounds: session.total_rounds as i32,
        players: to_json(&session.code, "players", &session.players)?,
        chains: to_json(&session.code, "chains", &session.chains)?,
        ended_at: session.ended_at,
    };
    let row = sessions_adapter::update_session(conn, dto).await?;
    GameSession::try_from(row)
}

pub async fn delete<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    session: &GameSession,
) -> Result<(), DomainError> {
    Ok(sessions_adapter::delete_session(conn, session.id, session.version).await?)
}

/// Remove finished sessions whose `ended_at` is before `cutoff`.
pub async fn reap_finished<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    cutoff: OffsetDateTime,
) -> Result<u64, DomainError> {
    Ok(sessions_adapter::delete_finished_before(conn, cutoff).await?)
}
