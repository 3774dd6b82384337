//! SeaORM adapter for the session store - generic over ConnectionTrait.
//!
//! Functions return `DbErr`; the repos layer maps to `DomainError`.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QuerySelect, Set,
};

use crate::entities::game_sessions::{self, SessionStatus};
use crate::infra::db_errors::optimistic_lock_err;

pub mod dto;

pub use dto::{SessionCreate, SessionUpdate};

/// Distinguish "row gone" from "row moved on" after a guarded statement hit zero rows.
async fn zero_rows_error<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
    expected_version: i32,
) -> sea_orm::DbErr {
    match game_sessions::Entity::find_by_id(id).one(conn).await {
        Ok(Some(current)) => optimistic_lock_err(expected_version, current.lock_version),
        Ok(None) => sea_orm::DbErr::RecordNotFound("Session not found".to_string()),
        Err(e) => e,
    }
}

pub async fn find_by_code<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    code: &str,
) -> Result<Option<game_sessions::Model>, sea_orm::DbErr> {
    game_sessions::Entity::find()
        .filter(game_sessions::Column::Code.eq(code))
        .one(conn)
        .await
}

/// Load a session and hold its row until the transaction ends.
///
/// Postgres takes `FOR UPDATE`; SQLite has no row locks and already admits a
/// single writer per database.
pub async fn find_by_code_for_update<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    code: &str,
) -> Result<Option<game_sessions::Model>, sea_orm::DbErr> {
    let query = game_sessions::Entity::find().filter(game_sessions::Column::Code.eq(code));
    match conn.get_database_backend() {
        DbBackend::Postgres => query.lock_exclusive().one(conn).await,
        _ => query.one(conn).await,
    }
}

pub async fn code_exists<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    code: &str,
) -> Result<bool, sea_orm::DbErr> {
    let count = game_sessions::Entity::find()
        .filter(game_sessions::Column::Code.eq(code))
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub async fn create_session<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: SessionCreate,
) -> Result<game_sessions::Model, sea_orm::DbErr> {
    let active = game_sessions::ActiveModel {
        id: NotSet,
        code: Set(dto.code),
        host_id: Set(dto.host_id),
        status: Set(SessionStatus::Waiting),
        mode: Set(dto.mode),
        current_round: Set(0),
        total_rounds: Set(dto.total_rounds),
        max_players: Set(dto.max_players),
        players: Set(dto.players),
        chains: Set(serde_json::Value::Array(Vec::new())),
        created_at: Set(dto.created_at),
        updated_at: Set(dto.created_at),
        ended_at: Set(None),
        lock_version: Set(1),
    };
    active.insert(conn).await
}

/// Conditional rewrite: `WHERE id = ? AND lock_version = ?`, then refetch.
pub async fn update_session<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: SessionUpdate,
) -> Result<game_sessions::Model, sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();

    let result = game_sessions::Entity::update_many()
        .col_expr(game_sessions::Column::HostId, Expr::value(dto.host_id))
        .col_expr(game_sessions::Column::Status, Expr::value(dto.status))
        .col_expr(
            game_sessions::Column::CurrentRound,
            Expr::value(dto.current_round),
        )
        .col_expr(
            game_sessions::Column::TotalRounds,
            Expr::value(dto.total_rounds),
        )
        .col_expr(game_sessions::Column::Players, Expr::value(dto.players))
        .col_expr(game_sessions::Column::Chains, Expr::value(dto.chains))
        .col_expr(game_sessions::Column::EndedAt, Expr::value(dto.ended_at))
        .col_expr(game_sessions::Column::UpdatedAt, Expr::value(now))
        .col_expr(
            game_sessions::Column::LockVersion,
            Expr::col(game_sessions::Column::LockVersion).add(1),
        )
        .filter(game_sessions::Column::Id.eq(dto.id))
        .filter(game_sessions::Column::LockVersion.eq(dto.expected_version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(zero_rows_error(conn, dto.id, dto.expected_version).await);
    }

    game_sessions::Entity::find_by_id(dto.id)
        .one(conn)
        .await?
        .ok_or_else(|| sea_orm::DbErr::RecordNotFound("Session not found".to_string()))
}

/// Version-guarded hard delete.
pub async fn delete_session<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
    expected_version: i32,
) -> Result<(), sea_orm::DbErr> {
    let result = game_sessions::Entity::delete_many()
        .filter(game_sessions::Column::Id.eq(id))
        .filter(game_sessions::Column::LockVersion.eq(expected_version))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(zero_rows_error(conn, id, expected_version).await);
    }
    Ok(())
}

/// Delete finished sessions that ended before `cutoff`. Returns rows removed.
pub async fn delete_finished_before<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    cutoff: time::OffsetDateTime,
) -> Result<u64, sea_orm::DbErr> {
    let result = game_sessions::Entity::delete_many()
        .filter(game_sessions::Column::Status.eq(SessionStatus::Finished))
        .filter(game_sessions::Column::EndedAt.lt(cutoff))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
