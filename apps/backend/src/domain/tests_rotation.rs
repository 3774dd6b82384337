use crate::domain::rotation::{assignee_for, assignment, chain_index_for};
use crate::domain::session::{PlayerState, SessionStatus, TaskType};
use crate::domain::test_helpers::{now, play_round, started_session};
use crate::errors::domain::{DomainError, InfraErrorKind};

#[test]
fn three_player_assignments_match_formula() {
    // Round 1: identity. Round 2: A->1, B->2, C->0. Round 3: A->2, B->0, C->1.
    assert_eq!(
        (0..3).map(|i| chain_index_for(i, 1, 3)).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(
        (0..3).map(|i| chain_index_for(i, 2, 3)).collect::<Vec<_>>(),
        vec![1, 2, 0]
    );
    assert_eq!(
        (0..3).map(|i| chain_index_for(i, 3, 3)).collect::<Vec<_>>(),
        vec![2, 0, 1]
    );
}

#[test]
fn assignee_inverts_chain_index() {
    for players in 1..8 {
        for round in 1..=players as u32 {
            for i in 0..players {
                let chain = chain_index_for(i, round, players);
                assert_eq!(assignee_for(chain, round, players), i);
            }
        }
    }
}

#[test]
fn abc_scenario_runs_to_finished() {
    let mut session = started_session(&["A", "B", "C"]);
    assert_eq!(session.total_rounds, 3);

    // Round 1: prompts on own chains.
    for (i, name) in ["A", "B", "C"].iter().enumerate() {
        let task = session.task_for(name).unwrap();
        assert_eq!(task.chain_id, i);
        assert_eq!(task.task_type, TaskType::Prompt);
        assert!(task.previous_entry.is_none());
    }
    play_round(&mut session);
    assert_eq!(session.current_round, 2);

    // Round 2: drawings of the prior prompt.
    let a = session.task_for("A").unwrap();
    assert_eq!(a.chain_id, 1);
    assert_eq!(a.task_type, TaskType::Drawing);
    let prev = a.previous_entry.unwrap();
    assert_eq!(prev.player_nickname, "B");
    assert_eq!(prev.task_type, TaskType::Prompt);
    assert_eq!(session.task_for("B").unwrap().chain_id, 2);
    assert_eq!(session.task_for("C").unwrap().chain_id, 0);
    play_round(&mut session);

    // Round 3: prompts guessing the drawing, on chain (i + 2) % 3.
    for (i, name) in ["A", "B", "C"].iter().enumerate() {
        let task = session.task_for(name).unwrap();
        assert_eq!(task.chain_id, (i + 2) % 3);
        assert_eq!(task.task_type, TaskType::Prompt);
    }
    play_round(&mut session);

    assert_eq!(session.status, SessionStatus::Finished);
    assert!(session.ended_at.is_some());
    let results = session.results().unwrap();
    assert_eq!(results.chains.len(), 3);
    for chain in &results.chains {
        assert_eq!(chain.entries.len(), 3);
        assert_eq!(chain.original_prompt.as_deref(), Some(chain.entries[0].data.as_str()));
        assert_eq!(chain.entries[0].player_nickname, chain.original_player);
    }
}

#[test]
fn empty_chain_after_round_one_is_corruption() {
    let mut session = started_session(&["A", "B", "C"]);
    session.current_round = 2;
    let err = assignment(&session, 0).unwrap_err();
    assert!(matches!(
        err,
        DomainError::Infra(InfraErrorKind::DataCorruption, _)
    ));
}

#[test]
fn chain_count_mismatch_is_corruption() {
    let mut session = started_session(&["A", "B", "C"]);
    session.chains.pop();
    let err = assignment(&session, 0).unwrap_err();
    assert!(matches!(
        err,
        DomainError::Infra(InfraErrorKind::DataCorruption, _)
    ));
}

#[test]
fn chain_skipped_by_departed_player_restarts_with_prompt() {
    let mut session = started_session(&["A", "B", "C"]);
    // B leaves before writing the round-1 prompt for chain 1.
    session.leave("B", now()).unwrap();
    assert_eq!(session.players[1].state, PlayerState::Left);
    session
        .submit("A", 0, TaskType::Prompt, "a cat".into(), now())
        .unwrap();
    session
        .submit("C", 2, TaskType::Prompt, "a hat".into(), now())
        .unwrap();
    assert_eq!(session.current_round, 2);

    // A now holds chain 1, which B never started.
    let task = session.task_for("A").unwrap();
    assert_eq!(task.chain_id, 1);
    assert_eq!(task.task_type, TaskType::Prompt);
    assert!(task.previous_entry.is_none());
}

#[test]
fn previous_entry_is_most_recent_entry() {
    let mut session = started_session(&["A", "B"]);
    play_round(&mut session);
    let task = session.task_for("B").unwrap();
    let chain = &session.chains[task.chain_id];
    assert_eq!(task.previous_entry.as_ref(), chain.entries.last());
}
