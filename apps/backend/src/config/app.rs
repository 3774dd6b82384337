//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::config::db::{DbKind, RuntimeEnv};
use crate::error::AppError;

pub const DEFAULT_MAX_PLAYERS: u32 = 8;
pub const MIN_PLAYERS: u32 = 2;
pub const MAX_PLAYERS_LIMIT: u32 = 20;

/// Knobs for session rules and the coordinator's retry loop.
#[derive(Debug, Clone)]
pub struct GameSettings {
    pub default_max_players: u32,
    pub code_length: usize,
    /// Attempts per mutation before an optimistic conflict is surfaced.
    pub retry_budget: u32,
    pub disconnect_grace: Duration,
    pub reaper_interval: Duration,
    pub finished_retention: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            default_max_players: DEFAULT_MAX_PLAYERS,
            code_length: 6,
            retry_budget: 5,
            disconnect_grace: Duration::from_secs(30),
            reaper_interval: Duration::from_secs(300),
            finished_retention: Duration::from_secs(86_400),
        }
    }
}

impl GameSettings {
    pub fn with_disconnect_grace(mut self, grace: Duration) -> Self {
        self.disconnect_grace = grace;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub runtime_env: RuntimeEnv,
    pub db_kind: DbKind,
    pub max_json_payload_size: usize,
    pub game: GameSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let host = env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var("BACKEND_PORT", 3001u16)?;

        let db_kind = match env::var("TELEPHONE_DB") {
            Ok(raw) => DbKind::parse(&raw)?,
            Err(_) => DbKind::Postgres,
        };

        let max_json_payload_size = parse_var("MAX_JSON_PAYLOAD_BYTES", 8 * 1024 * 1024usize)?;

        let grace_secs = parse_var("TELEPHONE_DISCONNECT_GRACE_SECS", 30u64)?;
        if grace_secs == 0 {
            return Err(AppError::config(
                "TELEPHONE_DISCONNECT_GRACE_SECS must be greater than 0",
            ));
        }
        let reaper_secs = parse_var("TELEPHONE_REAPER_INTERVAL_SECS", 300u64)?;
        let retention_secs = parse_var("TELEPHONE_FINISHED_RETENTION_SECS", 86_400u64)?;

        let game = GameSettings {
            disconnect_grace: Duration::from_secs(grace_secs),
            reaper_interval: Duration::from_secs(reaper_secs.max(1)),
            finished_retention: Duration::from_secs(retention_secs),
            ..GameSettings::default()
        };

        Ok(Self {
            host,
            port,
            runtime_env: RuntimeEnv::Prod,
            db_kind,
            max_json_payload_size,
            game,
        })
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{name} has an invalid value: '{raw}'"))),
        Err(_) => Ok(default),
    }
}
