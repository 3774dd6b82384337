use crate::config::app::GameSettings;
use crate::config::db::{DbKind, RuntimeEnv};
use crate::error::AppError;
use crate::infra::db::bootstrap_db;
use crate::state::app_state::AppState;

/// Builder for creating AppState instances (used in both tests and main)
pub struct StateBuilder {
    env: RuntimeEnv,
    db_kind: Option<DbKind>,
    settings: GameSettings,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            env: RuntimeEnv::Prod,
            db_kind: None,
            settings: GameSettings::default(),
        }
    }

    pub fn with_env(mut self, env: RuntimeEnv) -> Self {
        self.env = env;
        self
    }

    pub fn with_db(mut self, kind: DbKind) -> Self {
        self.db_kind = Some(kind);
        self
    }

    pub fn with_settings(mut self, settings: GameSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Connect, migrate, and wire the services.
    pub async fn build(self) -> Result<AppState, AppError> {
        let Some(kind) = self.db_kind else {
            return Err(AppError::config("No database configured for application state"));
        };
        let conn = bootstrap_db(self.env, kind).await?;
        Ok(AppState::new(conn, self.settings))
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn build_without_db_is_a_config_error() {
        let err = build_state().build().await.err().unwrap();
        assert_eq!(err.status().as_u16(), 500);
    }

    #[tokio::test]
    async fn build_with_memory_db_carries_settings() {
        let settings = GameSettings::default().with_disconnect_grace(Duration::from_millis(250));
        let state = build_state()
            .with_env(RuntimeEnv::Test)
            .with_db(DbKind::SqliteMemory)
            .with_settings(settings)
            .build()
            .await
            .unwrap();
        assert_eq!(state.settings().disconnect_grace, Duration::from_millis(250));
        assert_eq!(state.disconnects().grace(), Duration::from_millis(250));
    }
}
