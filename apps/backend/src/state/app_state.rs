use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::app::GameSettings;
use crate::services::disconnect::DisconnectSupervisor;
use crate::services::sessions::SessionCoordinator;
use crate::ws::broker::RealtimeBroker;
use crate::ws::hub::WsRegistry;

/// Shared resources handed to every handler and websocket actor.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    realtime: Arc<RealtimeBroker>,
    sessions: SessionCoordinator,
    disconnects: Arc<DisconnectSupervisor>,
    settings: Arc<GameSettings>,
}

impl AppState {
    /// Wire the coordinator, broadcaster and supervisor around one pool.
    pub fn new(db: DatabaseConnection, settings: GameSettings) -> Self {
        let settings = Arc::new(settings);
        let realtime = RealtimeBroker::new();
        let sessions = SessionCoordinator::new(db.clone(), realtime.clone(), settings.clone());
        let disconnects = DisconnectSupervisor::new(
            sessions.clone(),
            realtime.registry(),
            settings.disconnect_grace,
        );
        Self {
            db,
            realtime,
            sessions,
            disconnects,
            settings,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn sessions(&self) -> &SessionCoordinator {
        &self.sessions
    }

    pub fn realtime(&self) -> &Arc<RealtimeBroker> {
        &self.realtime
    }

    pub fn websocket_registry(&self) -> Arc<WsRegistry> {
        self.realtime.registry()
    }

    pub fn disconnects(&self) -> &Arc<DisconnectSupervisor> {
        &self.disconnects
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }
}
