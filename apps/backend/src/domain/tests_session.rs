use crate::domain::session::{
    normalize_nickname, LeaveOutcome, PlayerState, RoundAdvance, SessionStatus, TaskType,
};
use crate::domain::test_helpers::{now, play_round, started_session, waiting_session};
use crate::errors::domain::{ConflictKind, DomainError, NotFoundKind, ValidationKind};

#[test]
fn nickname_is_trimmed_and_bounded() {
    assert_eq!(normalize_nickname("  Ana  ").unwrap(), "Ana");
    assert!(normalize_nickname("   ").is_err());
    assert!(normalize_nickname(&"x".repeat(25)).is_err());
    assert_eq!(normalize_nickname(&"é".repeat(24)).unwrap().chars().count(), 24);
    // Decomposed "é" composes to a single char under NFC.
    assert_eq!(normalize_nickname("e\u{301}").unwrap(), "\u{e9}");
}

#[test]
fn join_rejects_duplicate_nickname_case_insensitively() {
    let mut session = waiting_session(&["Ana", "Bo"]);
    let err = session.join("ana", None).unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(ConflictKind::NicknameTaken, _)
    ));
    assert_eq!(session.players.len(), 2);
}

#[test]
fn join_after_start_is_rejected() {
    let mut session = started_session(&["A", "B"]);
    let err = session.join("C", None).unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(ConflictKind::AlreadyStarted, _)
    ));
}

#[test]
fn join_respects_max_players() {
    let mut session = waiting_session(&["A", "B"]);
    session.max_players = 2;
    let err = session.join("C", None).unwrap_err();
    assert!(matches!(err, DomainError::Conflict(ConflictKind::RoomFull, _)));
}

#[test]
fn account_id_marks_non_guest() {
    let mut session = waiting_session(&["A"]);
    session.join("B", Some("acct-7".into())).unwrap();
    let b = session.player("B").unwrap();
    assert!(!b.is_guest);
    assert_eq!(b.account_id.as_deref(), Some("acct-7"));
    assert!(session.player("A").unwrap().is_guest);
}

#[test]
fn start_builds_one_chain_per_player() {
    let mut session = waiting_session(&["A", "B", "C", "D"]);
    session.total_rounds = 9;
    session.start().unwrap();
    assert_eq!(session.status, SessionStatus::InProgress);
    assert_eq!(session.current_round, 1);
    assert_eq!(session.total_rounds, 4);
    assert_eq!(session.chains.len(), 4);
    for (i, chain) in session.chains.iter().enumerate() {
        assert_eq!(chain.chain_id, i);
        assert_eq!(chain.original_player, session.players[i].nickname);
        assert!(chain.entries.is_empty());
        assert!(chain.original_prompt.is_none());
    }
}

#[test]
fn double_start_is_rejected() {
    let mut session = started_session(&["A", "B"]);
    let before = session.clone();
    let err = session.start().unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(ConflictKind::AlreadyStarted, _)
    ));
    assert_eq!(session, before);
}

#[test]
fn start_needs_two_players() {
    let mut session = waiting_session(&["Solo"]);
    let err = session.start().unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::InvalidConfig, _)
    ));
}

#[test]
fn submit_wrong_chain_mutates_nothing() {
    let mut session = started_session(&["A", "B", "C"]);
    let before = session.clone();
    let err = session
        .submit("A", 2, TaskType::Prompt, "spoofed".into(), now())
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::WrongChain, _)
    ));
    assert_eq!(session, before);
}

#[test]
fn submit_twice_in_a_round_is_rejected() {
    let mut session = started_session(&["A", "B", "C"]);
    session
        .submit("A", 0, TaskType::Prompt, "first".into(), now())
        .unwrap();
    let err = session
        .submit("A", 0, TaskType::Prompt, "second".into(), now())
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(ConflictKind::AlreadySubmitted, _)
    ));
    assert_eq!(session.chains[0].entries.len(), 1);
    assert_eq!(session.chains[0].original_prompt.as_deref(), Some("first"));
}

#[test]
fn submit_wrong_type_is_rejected() {
    let mut session = started_session(&["A", "B"]);
    let err = session
        .submit("A", 0, TaskType::Drawing, "img".into(), now())
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::WrongTaskType, _)
    ));
}

#[test]
fn submit_before_start_is_phase_mismatch() {
    let mut session = waiting_session(&["A", "B"]);
    let err = session
        .submit("A", 0, TaskType::Prompt, "x".into(), now())
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::PhaseMismatch, _)
    ));
}

#[test]
fn submit_counts_and_advances_once() {
    let mut session = started_session(&["A", "B"]);
    let first = session
        .submit("A", 0, TaskType::Prompt, "a".into(), now())
        .unwrap();
    assert_eq!(first.submitted_count, 1);
    assert_eq!(first.total_players, 2);
    assert!(!first.all_submitted);
    assert_eq!(first.advance, RoundAdvance::Pending);

    let second = session
        .submit("B", 1, TaskType::Prompt, "b".into(), now())
        .unwrap();
    assert!(second.all_submitted);
    assert_eq!(second.advance, RoundAdvance::NextRound(2));
    assert_eq!(session.current_round, 2);
}

#[test]
fn task_reports_already_submitted() {
    let mut session = started_session(&["A", "B"]);
    assert!(!session.task_for("A").unwrap().already_submitted);
    session
        .submit("A", 0, TaskType::Prompt, "a".into(), now())
        .unwrap();
    assert!(session.task_for("A").unwrap().already_submitted);
}

#[test]
fn task_for_unknown_player_is_not_found() {
    let session = started_session(&["A", "B"]);
    let err = session.task_for("Z").unwrap_err();
    assert!(matches!(err, DomainError::NotFound(NotFoundKind::Player, _)));
}

#[test]
fn host_leaving_lobby_hands_over_host() {
    let mut session = waiting_session(&["Host", "B", "C"]);
    let outcome = session.leave("Host", now()).unwrap();
    assert_eq!(
        outcome,
        LeaveOutcome::Removed {
            nickname: "Host".into(),
            new_host: Some("B".into())
        }
    );
    assert_eq!(session.host_id, "B");
    assert_eq!(session.players.len(), 2);
}

#[test]
fn last_player_leaving_lobby_empties_session() {
    let mut session = waiting_session(&["Host"]);
    let outcome = session.leave("Host", now()).unwrap();
    assert_eq!(
        outcome,
        LeaveOutcome::Emptied {
            nickname: "Host".into()
        }
    );
    assert!(session.is_abandoned());
}

#[test]
fn leaving_mid_round_keeps_slot_and_unblocks_round() {
    let mut session = started_session(&["A", "B", "C"]);
    session
        .submit("A", 0, TaskType::Prompt, "a".into(), now())
        .unwrap();
    session
        .submit("B", 1, TaskType::Prompt, "b".into(), now())
        .unwrap();

    let outcome = session.leave("C", now()).unwrap();
    assert_eq!(
        outcome,
        LeaveOutcome::MarkedLeft {
            nickname: "C".into(),
            advance: RoundAdvance::NextRound(2)
        }
    );
    assert_eq!(session.players.len(), 3);
    assert_eq!(session.players[2].state, PlayerState::Left);

    // Leaving again is a no-op.
    assert_eq!(session.leave("C", now()).unwrap(), LeaveOutcome::Unchanged);
}

#[test]
fn departed_player_cannot_submit() {
    let mut session = started_session(&["A", "B", "C"]);
    session.leave("A", now()).unwrap();
    let err = session
        .submit("A", 0, TaskType::Prompt, "late".into(), now())
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::PlayerLeft, _)
    ));
}

#[test]
fn everyone_leaving_finishes_the_game() {
    let mut session = started_session(&["A", "B"]);
    session.leave("A", now()).unwrap();
    let outcome = session.leave("B", now()).unwrap();
    assert_eq!(
        outcome,
        LeaveOutcome::MarkedLeft {
            nickname: "B".into(),
            advance: RoundAdvance::Finished
        }
    );
    assert_eq!(session.status, SessionStatus::Finished);
}

#[test]
fn last_round_departure_finishes_game() {
    let mut session = started_session(&["A", "B", "C"]);
    play_round(&mut session);
    play_round(&mut session);
    session
        .submit("A", 2, TaskType::Prompt, "a".into(), now())
        .unwrap();
    session
        .submit("B", 0, TaskType::Prompt, "b".into(), now())
        .unwrap();
    let outcome = session.leave("C", now()).unwrap();
    assert!(matches!(
        outcome,
        LeaveOutcome::MarkedLeft {
            advance: RoundAdvance::Finished,
            ..
        }
    ));
    // Skipped turn leaves no placeholder.
    assert_eq!(session.chains[1].entries.len(), 2);
}

#[test]
fn results_only_after_finish_and_finish_is_idempotent() {
    let mut session = started_session(&["A", "B"]);
    let err = session.results().unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::ResultsNotReady, _)
    ));

    assert!(session.finish(now()));
    let ended = session.ended_at;
    assert!(!session.finish(now()));
    assert_eq!(session.ended_at, ended);

    let results = session.results().unwrap();
    assert_eq!(results.players.len(), 2);
    assert_eq!(results.chains.len(), 2);
}

#[test]
fn session_serializes_with_client_field_names() {
    let session = started_session(&["A", "B"]);
    let json = serde_json::to_value(&session).unwrap();
    assert_eq!(json["status"], "in-progress");
    assert_eq!(json["hostId"], "A");
    assert_eq!(json["currentRound"], 1);
    assert_eq!(json["players"][0]["state"], "active");
    assert_eq!(json["players"][0]["isGuest"], true);
    assert_eq!(json["chains"][1]["chainId"], 1);
    assert!(json["endedAt"].is_null());
    assert!(json.get("id").is_none());
}
