//! SeaORM -> DomainError translation.
//!
//! Adapters surface `sea_orm::DbErr`; repos convert through `map_db_err` so
//! services only ever see `DomainError`.

use serde::Deserialize;
use tracing::{error, warn};

use crate::errors::domain::{ConflictKind, DomainError, InfraErrorKind, NotFoundKind};
use crate::trace_ctx;

/// Prefix of the custom error raised by a zero-row optimistic update.
pub const OPTIMISTIC_LOCK_PREFIX: &str = "OPTIMISTIC_LOCK:";

#[derive(Deserialize)]
struct LockInfo {
    expected: i32,
    actual: i32,
}

fn mentions_sqlstate(msg: &str, code: &str) -> bool {
    msg.contains(code) || msg.contains(&format!("SQLSTATE({code})"))
}

fn is_unique_violation(msg: &str) -> bool {
    mentions_sqlstate(msg, "23505")
        || msg.contains("duplicate key value violates unique constraint")
        || msg.contains("UNIQUE constraint failed")
}

/// Both backends name the code column: SQLite as `game_sessions.code`,
/// Postgres through the generated `game_sessions_code_key` constraint.
fn is_join_code_violation(msg: &str) -> bool {
    msg.contains("game_sessions.code") || msg.contains("game_sessions_code_key")
}

/// SQLite reports a held write lock as SQLITE_BUSY (5) or SQLITE_LOCKED (6).
fn is_sqlite_busy(msg: &str) -> bool {
    msg.contains("database is locked")
        || msg.contains("database table is locked")
        || msg.contains("database is busy")
        || msg.contains("SQLITE_BUSY")
}

/// Build the custom error an adapter returns when its versioned update matched no row.
pub fn optimistic_lock_err(expected: i32, actual: i32) -> sea_orm::DbErr {
    sea_orm::DbErr::Custom(format!(
        "{OPTIMISTIC_LOCK_PREFIX}{{\"expected\":{expected},\"actual\":{actual}}}"
    ))
}

/// Translate a `DbErr` into a `DomainError` with a client-safe detail.
pub fn map_db_err(e: sea_orm::DbErr) -> DomainError {
    let trace_id = trace_ctx::trace_id();

    match &e {
        sea_orm::DbErr::RecordNotFound(what) => {
            return DomainError::not_found(
                NotFoundKind::Other("Record".into()),
                format!("Record not found: {what}"),
            );
        }
        sea_orm::DbErr::Custom(msg) if msg.starts_with(OPTIMISTIC_LOCK_PREFIX) => {
            let payload = &msg[OPTIMISTIC_LOCK_PREFIX.len()..];
            return match serde_json::from_str::<LockInfo>(payload) {
                Ok(info) => {
                    warn!(
                        trace_id = %trace_id,
                        expected = info.expected,
                        actual = info.actual,
                        "Optimistic lock conflict"
                    );
                    DomainError::conflict(
                        ConflictKind::OptimisticLock,
                        format!(
                            "Session was modified concurrently (expected version {}, actual {})",
                            info.expected, info.actual
                        ),
                    )
                }
                Err(_) => DomainError::conflict(
                    ConflictKind::OptimisticLock,
                    "Session was modified concurrently",
                ),
            };
        }
        sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_) => {
            warn!(trace_id = %trace_id, error = %e, "Database unavailable");
            return DomainError::infra(InfraErrorKind::DbUnavailable, "Database unavailable");
        }
        _ => {}
    }

    let msg = e.to_string();

    if is_unique_violation(&msg) {
        warn!(trace_id = %trace_id, error = %msg, "Unique constraint violation");
        if is_join_code_violation(&msg) {
            return DomainError::conflict(ConflictKind::JoinCodeConflict, "Join code already exists");
        }
        return DomainError::conflict(
            ConflictKind::Other("Unique".into()),
            "Unique constraint violation",
        );
    }

    if is_sqlite_busy(&msg) {
        warn!(trace_id = %trace_id, error = %msg, "SQLite write lock contended");
        return DomainError::infra(InfraErrorKind::DbBusy, "Database is busy");
    }

    if msg.contains("timeout") || msg.contains("timed out") {
        warn!(trace_id = %trace_id, error = %msg, "Database timeout");
        return DomainError::infra(InfraErrorKind::Timeout, "Database timeout");
    }

    error!(trace_id = %trace_id, error = %msg, "Unhandled database error");
    DomainError::infra(
        InfraErrorKind::Other("DbErr".into()),
        "Database operation failed",
    )
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        map_db_err(e)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DbErr, RuntimeErr};

    use super::*;

    #[test]
    fn optimistic_lock_payload_is_parsed() {
        let err = map_db_err(optimistic_lock_err(3, 4));
        match err {
            DomainError::Conflict(ConflictKind::OptimisticLock, detail) => {
                assert!(detail.contains("expected version 3"));
                assert!(detail.contains("actual 4"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_lock_payload_still_conflicts() {
        let err = map_db_err(DbErr::Custom("OPTIMISTIC_LOCK:garbage".into()));
        assert!(err.is_optimistic_lock());
    }

    #[test]
    fn sqlite_code_violation_is_join_code_conflict() {
        let err = map_db_err(DbErr::Exec(RuntimeErr::Internal(
            "UNIQUE constraint failed: game_sessions.code".into(),
        )));
        assert_eq!(
            err,
            DomainError::conflict(ConflictKind::JoinCodeConflict, "Join code already exists")
        );
    }

    #[test]
    fn postgres_code_violation_is_join_code_conflict() {
        let err = map_db_err(DbErr::Query(RuntimeErr::Internal(
            "duplicate key value violates unique constraint \"game_sessions_code_key\"".into(),
        )));
        assert!(matches!(
            err,
            DomainError::Conflict(ConflictKind::JoinCodeConflict, _)
        ));
    }

    #[test]
    fn sqlite_busy_is_retryable() {
        let err = map_db_err(DbErr::Exec(RuntimeErr::Internal(
            "error returned from database: (code: 5) database is locked".into(),
        )));
        assert!(matches!(err, DomainError::Infra(InfraErrorKind::DbBusy, _)));
        assert!(err.is_retryable());
        assert!(!err.is_optimistic_lock());
    }

    #[test]
    fn unclassified_errors_are_not_retryable() {
        let err = map_db_err(DbErr::Exec(RuntimeErr::Internal("disk I/O error".into())));
        assert!(matches!(err, DomainError::Infra(InfraErrorKind::Other(_), _)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn record_not_found_maps_to_not_found() {
        let err = map_db_err(DbErr::RecordNotFound("game_sessions".into()));
        assert!(matches!(err, DomainError::NotFound(_, _)));
    }
}
