//! Property tests for chain rotation (pure domain, no DB).
//!
//! Properties tested:
//! - Each round's chain assignment is a permutation of [0, P)
//! - Over P rounds every player visits every chain exactly once
//! - Task types alternate along every chain, starting with a prompt
//! - originalPrompt is the round-1 prompt and never changes afterwards

use std::collections::HashSet;

use proptest::prelude::*;

use crate::domain::rotation::chain_index_for;
use crate::domain::session::{SessionStatus, TaskType};
use crate::domain::test_helpers::{play_round, started_session};
use crate::domain::test_prelude;

fn names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("player{i}")).collect()
}

proptest! {
    #![proptest_config(test_prelude::proptest_config())]

    /// Property: rotation is a bijection each round
    #[test]
    fn prop_round_assignment_is_permutation(players in 1usize..=20, round_seed in 0u32..1000) {
        let round = round_seed % players as u32 + 1;
        let chains: HashSet<usize> = (0..players)
            .map(|i| chain_index_for(i, round, players))
            .collect();
        prop_assert_eq!(chains.len(), players);
        prop_assert!(chains.iter().all(|&c| c < players));
    }

    /// Property: closed rotation, every (player, chain) pair exactly once
    #[test]
    fn prop_full_rotation_covers_every_chain_once(players in 1usize..=20) {
        for i in 0..players {
            let visited: HashSet<usize> = (1..=players as u32)
                .map(|r| chain_index_for(i, r, players))
                .collect();
            prop_assert_eq!(visited.len(), players);
        }
    }

    /// Property: entries alternate prompt/drawing and the game finishes after P rounds
    #[test]
    fn prop_full_game_alternates_types(players in 2usize..=8) {
        let roster = names(players);
        let refs: Vec<&str> = roster.iter().map(String::as_str).collect();
        let mut session = started_session(&refs);

        let mut first_prompts = Vec::new();
        for round in 1..=players as u32 {
            prop_assert_eq!(session.current_round, round);
            play_round(&mut session);
            if round == 1 {
                first_prompts = session
                    .chains
                    .iter()
                    .map(|c| c.original_prompt.clone())
                    .collect();
            }
        }

        prop_assert_eq!(session.status, SessionStatus::Finished);
        for (chain, first) in session.chains.iter().zip(first_prompts) {
            prop_assert_eq!(chain.entries.len(), players);
            prop_assert_eq!(chain.entries[0].task_type, TaskType::Prompt);
            for pair in chain.entries.windows(2) {
                prop_assert_eq!(pair[1].task_type, pair[0].task_type.complement());
                prop_assert_eq!(pair[1].round, pair[0].round + 1);
            }
            prop_assert_eq!(chain.original_prompt.clone(), first);
            prop_assert_eq!(
                chain.original_prompt.as_deref(),
                Some(chain.entries[0].data.as_str())
            );
            // Each player appears once per chain.
            let authors: HashSet<&str> = chain
                .entries
                .iter()
                .map(|e| e.player_nickname.as_str())
                .collect();
            prop_assert_eq!(authors.len(), players);
        }
    }
}
