use time::OffsetDateTime;

use crate::domain::session::{GameSession, Player, SessionOptions, TaskType};

pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Waiting session hosted by `names[0]` with the rest joined in order.
pub fn waiting_session(names: &[&str]) -> GameSession {
    let mut session = GameSession::new(
        "ABC123".to_string(),
        Player::new(names[0].to_string(), None),
        SessionOptions {
            max_players: 20,
            ..Default::default()
        },
        now(),
    );
    for name in &names[1..] {
        session.join(name, None).expect("join");
    }
    session
}

pub fn started_session(names: &[&str]) -> GameSession {
    let mut session = waiting_session(names);
    session.start().expect("start");
    session
}

/// Every active player submits their assigned task for the current round.
pub fn play_round(session: &mut GameSession) {
    let round = session.current_round;
    let names: Vec<String> = session
        .players
        .iter()
        .filter(|p| !p.is_left())
        .map(|p| p.nickname.clone())
        .collect();
    for name in names {
        let task = session.task_for(&name).expect("task");
        let data = match task.task_type {
            TaskType::Prompt => format!("{name} writes in round {round}"),
            TaskType::Drawing => format!("data:image/png;base64,{name}{round}"),
        };
        session
            .submit(&name, task.chain_id, task.task_type, data, now())
            .expect("submit");
    }
}
