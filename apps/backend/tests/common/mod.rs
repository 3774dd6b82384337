#![allow(dead_code, unused_macros, unused_imports)]

use telephone::domain::session::{SessionStatus, TaskType};
use telephone::services::sessions::{NewEntry, NewSession};
use telephone::{build_state, AppState, DbKind, GameSettings, RuntimeEnv};

#[ctor::ctor]
fn init_logging() {
    backend_test_support::logging::init();
}

/// Initialise the full route table over `state`, with trace ids.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(telephone::RequestTrace)
                .app_data(actix_web::web::Data::new($state))
                .configure(telephone::routes::configure),
        )
        .await
    };
}
pub(crate) use test_app;

/// Fresh state over a private in-memory SQLite database.
pub async fn test_state() -> AppState {
    test_state_with(GameSettings::default()).await
}

pub async fn test_state_with(settings: GameSettings) -> AppState {
    build_state()
        .with_env(RuntimeEnv::Test)
        .with_db(DbKind::SqliteMemory)
        .with_settings(settings)
        .build()
        .await
        .expect("build in-memory test state")
}

/// Create a lobby hosted by `names[0]` with everyone else joined.
pub async fn lobby(state: &AppState, names: &[&str]) -> String {
    let session = state
        .sessions()
        .create(NewSession {
            host_nickname: names[0].to_string(),
            ..NewSession::default()
        })
        .await
        .expect("create session");
    for name in &names[1..] {
        state
            .sessions()
            .join(&session.code, name, None)
            .await
            .expect("join session");
    }
    session.code
}

pub async fn started_game(state: &AppState, names: &[&str]) -> String {
    let code = lobby(state, names).await;
    state.sessions().start(&code).await.expect("start session");
    code
}

pub fn entry(nickname: &str, chain_id: usize, task_type: TaskType, round: u32) -> NewEntry {
    NewEntry {
        player_nickname: nickname.to_string(),
        chain_id,
        task_type,
        data: format!("{nickname} r{round}"),
    }
}

/// Every active player who has not yet acted submits their current task.
pub async fn play_round(state: &AppState, code: &str) {
    let session = state.sessions().get(code).await.expect("load session");
    assert_eq!(session.status, SessionStatus::InProgress);
    let round = session.current_round;
    for player in session.players.iter().filter(|p| !p.is_left()) {
        let task = state
            .sessions()
            .task(code, &player.nickname)
            .await
            .expect("player task");
        if task.already_submitted {
            continue;
        }
        state
            .sessions()
            .submit(code, entry(&player.nickname, task.chain_id, task.task_type, round))
            .await
            .expect("submit entry");
    }
}
