//! Chain rotation: which chain a player works on in a given round, and what
//! kind of entry that chain needs next.
//!
//! For `P` players and 1-based round `R`, player `i` acts on chain
//! `(i + R - 1) mod P`. Over `P` rounds every player visits every chain once.

use tracing::error;

use crate::domain::session::{Entry, GameSession, TaskType};
use crate::errors::domain::{DomainError, InfraErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub chain_id: usize,
    pub task_type: TaskType,
    pub previous_entry: Option<Entry>,
}

/// Chain index for `player_index` in 1-based `round`.
pub fn chain_index_for(player_index: usize, round: u32, total_players: usize) -> usize {
    debug_assert!(total_players > 0 && round >= 1);
    (player_index + (round as usize - 1)) % total_players
}

/// Player index assigned to `chain_index` in 1-based `round`.
pub fn assignee_for(chain_index: usize, round: u32, total_players: usize) -> usize {
    let shift = (round as usize - 1) % total_players;
    (chain_index + total_players - shift) % total_players
}

fn corruption(session: &GameSession, detail: String) -> DomainError {
    error!(
        code = %session.code,
        round = session.current_round,
        players = session.players.len(),
        chains = session.chains.len(),
        detail = %detail,
        "rotation invariant violated"
    );
    DomainError::infra(InfraErrorKind::DataCorruption, detail)
}

/// Work assignment for the player at `player_index` in the current round.
pub fn assignment(session: &GameSession, player_index: usize) -> Result<Assignment, DomainError> {
    let total = session.players.len();
    let round = session.current_round;
    if total == 0 || round == 0 {
        return Err(corruption(
            session,
            format!("no rotation at round {round} with {total} players"),
        ));
    }
    if session.chains.len() != total {
        return Err(corruption(
            session,
            format!("{} chains for {total} players", session.chains.len()),
        ));
    }

    let chain_id = chain_index_for(player_index, round, total);
    let chain = session
        .chains
        .get(chain_id)
        .ok_or_else(|| corruption(session, format!("chain {chain_id} missing")))?;

    if round == 1 {
        return Ok(Assignment {
            chain_id,
            task_type: TaskType::Prompt,
            previous_entry: None,
        });
    }

    if let Some(last) = chain.entries.last() {
        return Ok(Assignment {
            chain_id,
            task_type: last.task_type.complement(),
            previous_entry: Some(last.clone()),
        });
    }

    // Empty past round 1 is only legitimate when every earlier assignee left
    // without submitting; the chain then starts over with a prompt.
    let all_skipped = (1..round).all(|r| session.players[assignee_for(chain_id, r, total)].is_left());
    if all_skipped {
        return Ok(Assignment {
            chain_id,
            task_type: TaskType::Prompt,
            previous_entry: None,
        });
    }

    Err(corruption(
        session,
        format!("chain {chain_id} has no entries at round {round}"),
    ))
}
