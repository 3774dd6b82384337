//! Error codes for the telephone backend API.
//!
//! Add new codes here; never pass ad-hoc strings as error codes.
//! All codes are SCREAMING_SNAKE_CASE and map 1:1 to the strings that
//! appear in HTTP responses and websocket error frames.

use core::fmt;

/// Centralized error codes for the telephone backend API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Request Validation
    /// Session code is malformed
    InvalidSessionCode,
    /// Operation not valid for the session's current status
    PhaseMismatch,
    /// Submission targeted a chain other than the assigned one
    WrongChain,
    /// Submission type doesn't match the assigned task
    WrongTaskType,
    /// Nickname empty, too long or otherwise unusable
    InvalidNickname,
    /// Session settings out of range
    InvalidConfig,
    /// Player has already left the session
    PlayerLeft,
    /// Results requested before the session finished
    ResultsNotReady,
    /// General validation error
    ValidationError,
    /// General bad request error
    BadRequest,

    // Resource Not Found
    /// Session not found
    SessionNotFound,
    /// Player not found in session
    PlayerNotFound,
    /// General not found error
    NotFound,

    // Business Logic Conflicts
    /// Nickname already used in the session
    NicknameTaken,
    /// Player already submitted for the current round
    AlreadySubmitted,
    /// Session already started or finished
    AlreadyStarted,
    /// Session reached its player limit
    RoomFull,
    /// Generated join code collided with an existing session
    JoinCodeConflict,
    /// Optimistic lock conflict
    OptimisticLock,
    /// Generic conflict (fallback for unmatched conflicts)
    Conflict,

    // System Errors
    /// Database error
    DbError,
    /// Database unavailable
    DbUnavailable,
    /// Database timeout
    DbTimeout,
    /// Unique constraint violation
    UniqueViolation,
    /// Record not found (generic 404 for DB-driven not-found)
    RecordNotFound,
    /// Internal server error
    Internal,
    /// Configuration error
    ConfigError,
    /// Stored state violates game invariants
    DataCorruption,
}

impl ErrorCode {
    /// Returns the canonical SCREAMING_SNAKE_CASE string for this error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSessionCode => "INVALID_SESSION_CODE",
            Self::PhaseMismatch => "PHASE_MISMATCH",
            Self::WrongChain => "WRONG_CHAIN",
            Self::WrongTaskType => "WRONG_TASK_TYPE",
            Self::InvalidNickname => "INVALID_NICKNAME",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::PlayerLeft => "PLAYER_LEFT",
            Self::ResultsNotReady => "RESULTS_NOT_READY",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST",

            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::PlayerNotFound => "PLAYER_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",

            Self::NicknameTaken => "NICKNAME_TAKEN",
            Self::AlreadySubmitted => "ALREADY_SUBMITTED",
            Self::AlreadyStarted => "ALREADY_STARTED",
            Self::RoomFull => "ROOM_FULL",
            Self::JoinCodeConflict => "JOIN_CODE_CONFLICT",
            Self::OptimisticLock => "OPTIMISTIC_LOCK",
            Self::Conflict => "CONFLICT",

            Self::DbError => "DB_ERROR",
            Self::DbUnavailable => "DB_UNAVAILABLE",
            Self::DbTimeout => "DB_TIMEOUT",
            Self::UniqueViolation => "UNIQUE_VIOLATION",
            Self::RecordNotFound => "RECORD_NOT_FOUND",
            Self::Internal => "INTERNAL",
            Self::ConfigError => "CONFIG_ERROR",
            Self::DataCorruption => "DATA_CORRUPTION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
