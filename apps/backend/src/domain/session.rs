//! Game session aggregate: roster, chains and the status machine.
//!
//! Every mutation validates first and only then touches `self`, so a
//! returned error always leaves the session exactly as it was.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization;

use crate::domain::rotation::{self, Assignment};
use crate::errors::domain::{ConflictKind, DomainError, ValidationKind};

pub const MAX_NICKNAME_CHARS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Waiting,
    InProgress,
    Finished,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::InProgress => "in-progress",
            SessionStatus::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Prompt,
    Drawing,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Prompt => "prompt",
            TaskType::Drawing => "drawing",
        }
    }

    pub fn complement(self) -> Self {
        match self {
            TaskType::Prompt => TaskType::Drawing,
            TaskType::Drawing => TaskType::Prompt,
        }
    }
}

/// A player who left mid-game keeps their roster slot so indices stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Active,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub is_guest: bool,
    pub state: PlayerState,
}

impl Player {
    pub fn new(nickname: String, account_id: Option<String>) -> Self {
        let is_guest = account_id.is_none();
        Self {
            nickname,
            account_id,
            is_guest,
            state: PlayerState::Active,
        }
    }

    pub fn is_left(&self) -> bool {
        self.state == PlayerState::Left
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub player_nickname: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub data: String,
    pub round: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    pub chain_id: usize,
    pub original_player: String,
    pub original_prompt: Option<String>,
    pub entries: Vec<Entry>,
}

/// Options accepted at creation; `total_rounds` is provisional until start.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub total_rounds: Option<u32>,
    pub max_players: u32,
    pub mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    #[serde(skip)]
    pub id: i64,
    pub code: String,
    /// Nickname of the host.
    pub host_id: String,
    pub status: SessionStatus,
    pub mode: String,
    pub current_round: u32,
    pub total_rounds: u32,
    pub max_players: u32,
    pub players: Vec<Player>,
    pub chains: Vec<Chain>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    pub version: i32,
}

/// What a player should do right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTask {
    pub chain_id: usize,
    pub round: u32,
    pub task_type: TaskType,
    pub previous_entry: Option<Entry>,
    pub already_submitted: bool,
}

/// Round bookkeeping after a submission or departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundAdvance {
    Pending,
    NextRound(u32),
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub player_nickname: String,
    pub round: u32,
    pub chain_id: usize,
    pub all_submitted: bool,
    pub submitted_count: usize,
    pub total_players: usize,
    pub advance: RoundAdvance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Removed from a waiting roster. `new_host` is set when the host left.
    Removed { nickname: String, new_host: Option<String> },
    /// Roster is now empty; the session should be deleted.
    Emptied { nickname: String },
    /// Marked left in a running game.
    MarkedLeft { nickname: String, advance: RoundAdvance },
    /// Nothing to do: already left or the game is over.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResults {
    pub chains: Vec<Chain>,
    pub players: Vec<Player>,
}

/// Trim, NFC-normalize and bound a nickname.
pub fn normalize_nickname(raw: &str) -> Result<String, DomainError> {
    let nickname: String = raw.trim().nfc().collect();
    let chars = nickname.chars().count();
    if chars == 0 {
        return Err(DomainError::validation(
            ValidationKind::InvalidNickname,
            "Nickname must not be empty",
        ));
    }
    if chars > MAX_NICKNAME_CHARS {
        return Err(DomainError::validation(
            ValidationKind::InvalidNickname,
            format!("Nickname must be at most {MAX_NICKNAME_CHARS} characters"),
        ));
    }
    if nickname.chars().any(char::is_control) {
        return Err(DomainError::validation(
            ValidationKind::InvalidNickname,
            "Nickname must not contain control characters",
        ));
    }
    Ok(nickname)
}

/// Nicknames compare case-insensitively after normalization.
fn same_nickname(a: &str, b: &str) -> bool {
    fn key(s: &str) -> String {
        s.trim().nfc().collect::<String>().to_lowercase()
    }
    a == b || key(a) == key(b)
}

impl GameSession {
    pub fn new(
        code: String,
        host: Player,
        options: SessionOptions,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: 0,
            code,
            host_id: host.nickname.clone(),
            status: SessionStatus::Waiting,
            mode: options.mode.unwrap_or_else(|| "classic".to_string()),
            current_round: 0,
            total_rounds: options.total_rounds.unwrap_or(0),
            max_players: options.max_players,
            players: vec![host],
            chains: Vec::new(),
            created_at: now,
            ended_at: None,
            version: 1,
        }
    }

    pub fn player_index(&self, nickname: &str) -> Option<usize> {
        self.players
            .iter()
            .position(|p| same_nickname(&p.nickname, nickname))
    }

    pub fn player(&self, nickname: &str) -> Option<&Player> {
        self.player_index(nickname).map(|i| &self.players[i])
    }

    fn require_player_index(&self, nickname: &str) -> Result<usize, DomainError> {
        self.player_index(nickname)
            .ok_or_else(|| DomainError::player_not_found(nickname))
    }

    fn require_status(&self, expected: SessionStatus, action: &str) -> Result<(), DomainError> {
        if self.status != expected {
            return Err(DomainError::validation(
                ValidationKind::PhaseMismatch,
                format!(
                    "Cannot {action}: session is {}, expected {}",
                    self.status.as_str(),
                    expected.as_str()
                ),
            ));
        }
        Ok(())
    }

    pub fn active_players(&self) -> usize {
        self.players.iter().filter(|p| !p.is_left()).count()
    }

    pub fn join(&mut self, nickname: &str, account_id: Option<String>) -> Result<(), DomainError> {
        let nickname = normalize_nickname(nickname)?;
        if self.status != SessionStatus::Waiting {
            return Err(DomainError::conflict(
                ConflictKind::AlreadyStarted,
                "Game has already started",
            ));
        }
        if self.player_index(&nickname).is_some() {
            return Err(DomainError::conflict(
                ConflictKind::NicknameTaken,
                format!("Nickname '{nickname}' is already taken"),
            ));
        }
        if self.players.len() >= self.max_players as usize {
            return Err(DomainError::conflict(
                ConflictKind::RoomFull,
                format!("Session is full ({} players)", self.max_players),
            ));
        }
        self.players.push(Player::new(nickname, account_id));
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), DomainError> {
        match self.status {
            SessionStatus::Finished => {
                return Err(DomainError::conflict(
                    ConflictKind::AlreadyStarted,
                    "Game has already finished",
                ))
            }
            SessionStatus::InProgress if self.current_round > 0 => {
                return Err(DomainError::conflict(
                    ConflictKind::AlreadyStarted,
                    "Game has already started",
                ))
            }
            _ => {}
        }
        if self.players.len() < 2 {
            return Err(DomainError::validation(
                ValidationKind::InvalidConfig,
                "At least 2 players are required to start",
            ));
        }

        self.total_rounds = self.players.len() as u32;
        self.status = SessionStatus::InProgress;
        self.current_round = 1;
        self.chains = self
            .players
            .iter()
            .enumerate()
            .map(|(chain_id, p)| Chain {
                chain_id,
                original_player: p.nickname.clone(),
                original_prompt: None,
                entries: Vec::new(),
            })
            .collect();
        Ok(())
    }

    /// Whether `nickname` has an entry for `round` on any chain.
    pub fn has_submitted(&self, nickname: &str, round: u32) -> bool {
        self.chains.iter().any(|c| {
            c.entries
                .iter()
                .any(|e| e.round == round && same_nickname(&e.player_nickname, nickname))
        })
    }

    /// Players who count toward completing the current round. Left players
    /// count as submitted so a departure never stalls the game.
    pub fn submitted_count(&self) -> usize {
        self.players
            .iter()
            .filter(|p| p.is_left() || self.has_submitted(&p.nickname, self.current_round))
            .count()
    }

    pub fn task_for(&self, nickname: &str) -> Result<PlayerTask, DomainError> {
        let index = self.require_player_index(nickname)?;
        self.require_status(SessionStatus::InProgress, "fetch a task")?;
        if self.players[index].is_left() {
            return Err(DomainError::validation(
                ValidationKind::PlayerLeft,
                format!("Player '{}' has left the session", self.players[index].nickname),
            ));
        }
        let Assignment {
            chain_id,
            task_type,
            previous_entry,
        } = rotation::assignment(self, index)?;
        Ok(PlayerTask {
            chain_id,
            round: self.current_round,
            task_type,
            previous_entry,
            already_submitted: self.has_submitted(&self.players[index].nickname, self.current_round),
        })
    }

    pub fn submit(
        &mut self,
        nickname: &str,
        chain_id: usize,
        task_type: TaskType,
        data: String,
        now: OffsetDateTime,
    ) -> Result<SubmitOutcome, DomainError> {
        self.require_status(SessionStatus::InProgress, "submit")?;
        let index = self.require_player_index(nickname)?;
        let player_nickname = self.players[index].nickname.clone();
        if self.players[index].is_left() {
            return Err(DomainError::validation(
                ValidationKind::PlayerLeft,
                format!("Player '{player_nickname}' has left the session"),
            ));
        }
        if data.trim().is_empty() {
            return Err(DomainError::validation(
                ValidationKind::InvalidPayload,
                "Entry data must not be empty",
            ));
        }

        let assignment = rotation::assignment(self, index)?;
        if chain_id != assignment.chain_id {
            return Err(DomainError::validation(
                ValidationKind::WrongChain,
                format!(
                    "Player '{player_nickname}' is assigned chain {} this round, not {chain_id}",
                    assignment.chain_id
                ),
            ));
        }
        let round = self.current_round;
        if self.has_submitted(&player_nickname, round) {
            return Err(DomainError::conflict(
                ConflictKind::AlreadySubmitted,
                format!("Player '{player_nickname}' already submitted for round {round}"),
            ));
        }
        if task_type != assignment.task_type {
            return Err(DomainError::validation(
                ValidationKind::WrongTaskType,
                format!("Expected a {} entry this round", assignment.task_type.as_str()),
            ));
        }

        let chain = &mut self.chains[chain_id];
        if round == 1 && task_type == TaskType::Prompt && chain.original_prompt.is_none() {
            chain.original_prompt = Some(data.clone());
        }
        chain.entries.push(Entry {
            player_nickname: player_nickname.clone(),
            task_type,
            data,
            round,
        });

        let submitted_count = self.submitted_count();
        let total_players = self.players.len();
        let advance = self.advance_if_complete(now);

        Ok(SubmitOutcome {
            player_nickname,
            round,
            chain_id,
            all_submitted: submitted_count == total_players,
            submitted_count,
            total_players,
            advance,
        })
    }

    /// Move to the next round, or finish, once every player is accounted for.
    fn advance_if_complete(&mut self, now: OffsetDateTime) -> RoundAdvance {
        if self.status != SessionStatus::InProgress {
            return RoundAdvance::Pending;
        }
        if self.active_players() == 0 {
            self.finish(now);
            return RoundAdvance::Finished;
        }
        if self.submitted_count() < self.players.len() {
            return RoundAdvance::Pending;
        }
        if self.current_round >= self.total_rounds {
            self.finish(now);
            RoundAdvance::Finished
        } else {
            self.current_round += 1;
            RoundAdvance::NextRound(self.current_round)
        }
    }

    pub fn leave(&mut self, nickname: &str, now: OffsetDateTime) -> Result<LeaveOutcome, DomainError> {
        let index = self.require_player_index(nickname)?;
        let nickname = self.players[index].nickname.clone();

        match self.status {
            SessionStatus::Waiting => {
                let was_host = same_nickname(&self.host_id, &nickname);
                self.players.remove(index);
                if self.players.is_empty() {
                    return Ok(LeaveOutcome::Emptied { nickname });
                }
                let new_host = if was_host {
                    self.host_id = self.players[0].nickname.clone();
                    Some(self.host_id.clone())
                } else {
                    None
                };
                Ok(LeaveOutcome::Removed { nickname, new_host })
            }
            SessionStatus::InProgress => {
                if self.players[index].is_left() {
                    return Ok(LeaveOutcome::Unchanged);
                }
                self.players[index].state = PlayerState::Left;
                let advance = self.advance_if_complete(now);
                Ok(LeaveOutcome::MarkedLeft { nickname, advance })
            }
            SessionStatus::Finished => Ok(LeaveOutcome::Unchanged),
        }
    }

    /// Force-finish. Returns false when the session was already finished.
    pub fn finish(&mut self, now: OffsetDateTime) -> bool {
        if self.status == SessionStatus::Finished {
            return false;
        }
        self.status = SessionStatus::Finished;
        self.ended_at = Some(now);
        true
    }

    pub fn results(&self) -> Result<SessionResults, DomainError> {
        if self.status != SessionStatus::Finished {
            return Err(DomainError::validation(
                ValidationKind::ResultsNotReady,
                "Results are available once the game has finished",
            ));
        }
        Ok(SessionResults {
            chains: self.chains.clone(),
            players: self.players.clone(),
        })
    }

    /// A waiting session whose roster emptied; it is deleted rather than saved.
    pub fn is_abandoned(&self) -> bool {
        self.status == SessionStatus::Waiting && self.players.is_empty()
    }
}
