use actix_web::error::ResponseError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::errors::domain::{
    ConflictKind, DomainError, InfraErrorKind, NotFoundKind, ValidationKind,
};
use crate::errors::ErrorCode;
use crate::infra::db_errors::map_db_err;
use crate::trace_ctx;

#[derive(Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub code: String,
    pub trace_id: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {detail}")]
    Validation {
        code: ErrorCode,
        detail: String,
        status: StatusCode,
    },
    #[error("Database error: {detail}")]
    Db { detail: String },
    #[error("Not found: {detail}")]
    NotFound { code: ErrorCode, detail: String },
    #[error("Bad request: {detail}")]
    BadRequest { code: ErrorCode, detail: String },
    #[error("Internal error: {detail}")]
    Internal { code: ErrorCode, detail: String },
    #[error("Configuration error: {detail}")]
    Config { detail: String },
    #[error("Conflict: {detail}")]
    Conflict { code: ErrorCode, detail: String },
    #[error("Database unavailable: {detail}")]
    DbUnavailable { detail: String },
    #[error("Timeout: {detail}")]
    Timeout { detail: String },
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { code, .. } => *code,
            AppError::Db { .. } => ErrorCode::DbError,
            AppError::NotFound { code, .. } => *code,
            AppError::BadRequest { code, .. } => *code,
            AppError::Internal { code, .. } => *code,
            AppError::Config { .. } => ErrorCode::ConfigError,
            AppError::Conflict { code, .. } => *code,
            AppError::DbUnavailable { .. } => ErrorCode::DbUnavailable,
            AppError::Timeout { .. } => ErrorCode::DbTimeout,
        }
    }

    fn detail(&self) -> String {
        match self {
            AppError::Validation { detail, .. }
            | AppError::Db { detail }
            | AppError::NotFound { detail, .. }
            | AppError::BadRequest { detail, .. }
            | AppError::Internal { detail, .. }
            | AppError::Config { detail }
            | AppError::Conflict { detail, .. }
            | AppError::DbUnavailable { detail }
            | AppError::Timeout { detail } => detail.clone(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { status, .. } => *status,
            AppError::Db { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::DbUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn invalid(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Validation {
            code,
            detail: detail.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            code: ErrorCode::Internal,
            detail: detail.into(),
        }
    }

    pub fn bad_request(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            detail: detail.into(),
        }
    }

    pub fn not_found(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            detail: detail.into(),
        }
    }

    pub fn conflict(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    pub fn db(detail: impl Into<String>) -> Self {
        Self::Db {
            detail: detail.into(),
        }
    }

    pub fn db_unavailable(detail: impl Into<String>) -> Self {
        Self::DbUnavailable {
            detail: detail.into(),
        }
    }

    fn humanize_code(code: &str) -> String {
        code.split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(kind, detail) => {
                let code = match kind {
                    ValidationKind::PhaseMismatch => ErrorCode::PhaseMismatch,
                    ValidationKind::WrongChain => ErrorCode::WrongChain,
                    ValidationKind::WrongTaskType => ErrorCode::WrongTaskType,
                    ValidationKind::InvalidNickname => ErrorCode::InvalidNickname,
                    ValidationKind::InvalidPayload => ErrorCode::ValidationError,
                    ValidationKind::InvalidConfig => ErrorCode::InvalidConfig,
                    ValidationKind::InvalidSessionCode => ErrorCode::InvalidSessionCode,
                    ValidationKind::PlayerLeft => ErrorCode::PlayerLeft,
                    ValidationKind::ResultsNotReady => ErrorCode::ResultsNotReady,
                    ValidationKind::Other(_) => ErrorCode::ValidationError,
                };
                AppError::invalid(code, detail)
            }
            // Game-rule conflicts are reported as 400s; only a lost optimistic
            // race surfaces as 409.
            DomainError::Conflict(kind, detail) => match kind {
                ConflictKind::NicknameTaken => AppError::invalid(ErrorCode::NicknameTaken, detail),
                ConflictKind::AlreadySubmitted => {
                    AppError::invalid(ErrorCode::AlreadySubmitted, detail)
                }
                ConflictKind::AlreadyStarted => AppError::invalid(ErrorCode::AlreadyStarted, detail),
                ConflictKind::RoomFull => AppError::invalid(ErrorCode::RoomFull, detail),
                ConflictKind::JoinCodeConflict => {
                    AppError::conflict(ErrorCode::JoinCodeConflict, detail)
                }
                ConflictKind::OptimisticLock => AppError::conflict(ErrorCode::OptimisticLock, detail),
                ConflictKind::Other(_) => AppError::conflict(ErrorCode::Conflict, detail),
            },
            DomainError::NotFound(kind, detail) => {
                let code = match kind {
                    NotFoundKind::Session => ErrorCode::SessionNotFound,
                    NotFoundKind::Player => ErrorCode::PlayerNotFound,
                    NotFoundKind::Other(_) => ErrorCode::NotFound,
                };
                AppError::not_found(code, detail)
            }
            DomainError::Infra(kind, detail) => match kind {
                InfraErrorKind::DbUnavailable | InfraErrorKind::DbBusy => {
                    AppError::db_unavailable(detail)
                }
                InfraErrorKind::Timeout => AppError::Timeout { detail },
                InfraErrorKind::DataCorruption => {
                    error!(detail = %detail, "session state corrupted; rotation invariant violated");
                    AppError::Internal {
                        code: ErrorCode::DataCorruption,
                        detail,
                    }
                }
                InfraErrorKind::Other(_) => AppError::db(detail),
            },
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(e: sea_orm::DbErr) -> Self {
        AppError::from(map_db_err(e))
    }
}

impl From<std::env::VarError> for AppError {
    fn from(e: std::env::VarError) -> Self {
        AppError::config(format!("env var error: {e}"))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status();
        let code = self.code().as_str();
        let trace_id = trace_ctx::trace_id();

        let problem_details = ProblemDetails {
            type_: format!("https://telephone.game/errors/{code}"),
            title: Self::humanize_code(code),
            status: status.as_u16(),
            detail: self.detail(),
            code: code.to_string(),
            trace_id: trace_id.clone(),
        };

        HttpResponse::build(status)
            .content_type("application/problem+json")
            .insert_header(("x-trace-id", trace_id))
            .json(problem_details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_rule_conflicts_map_to_bad_request() {
        for (kind, code) in [
            (ConflictKind::NicknameTaken, ErrorCode::NicknameTaken),
            (ConflictKind::AlreadySubmitted, ErrorCode::AlreadySubmitted),
            (ConflictKind::AlreadyStarted, ErrorCode::AlreadyStarted),
            (ConflictKind::RoomFull, ErrorCode::RoomFull),
        ] {
            let app: AppError = DomainError::conflict(kind, "nope").into();
            assert_eq!(app.code(), code);
            assert_eq!(app.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn optimistic_lock_maps_to_409() {
        let app: AppError = DomainError::conflict(ConflictKind::OptimisticLock, "raced").into();
        assert_eq!(app.code(), ErrorCode::OptimisticLock);
        assert_eq!(app.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_kinds() {
        let app: AppError = DomainError::session_not_found("ABC123").into();
        assert_eq!(app.code(), ErrorCode::SessionNotFound);
        assert_eq!(app.status(), StatusCode::NOT_FOUND);

        let app: AppError = DomainError::player_not_found("zed").into();
        assert_eq!(app.code(), ErrorCode::PlayerNotFound);
    }

    #[test]
    fn data_corruption_is_internal() {
        let app: AppError =
            DomainError::infra(InfraErrorKind::DataCorruption, "chain 2 empty at round 3").into();
        assert_eq!(app.code(), ErrorCode::DataCorruption);
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn busy_database_is_503() {
        let app: AppError = DomainError::infra(InfraErrorKind::DbBusy, "database is locked").into();
        assert_eq!(app.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn phase_mismatch_is_400() {
        let app: AppError =
            DomainError::validation(ValidationKind::PhaseMismatch, "not in progress").into();
        assert_eq!(app.code(), ErrorCode::PhaseMismatch);
        assert_eq!(app.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn humanize() {
        assert_eq!(AppError::humanize_code("WRONG_CHAIN"), "Wrong Chain");
        assert_eq!(AppError::humanize_code("INTERNAL"), "Internal");
    }
}
