//! Session coordinator: every room operation as load → validate → mutate →
//! conditional write, followed by realtime publication after commit.
//!
//! Mutations for one code queue on an in-process room lock and read the row
//! with a locking select, so submits commit one at a time. Writes stay
//! guarded by the row's `lock_version`; when another process wins anyway the
//! whole closure is re-run against a fresh read, so validation and the
//! round-advance decision always see the latest roster and entries.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::config::app::{GameSettings, MAX_PLAYERS_LIMIT, MIN_PLAYERS};
use crate::db::txn::with_txn;
use crate::domain::session::{
    normalize_nickname, GameSession, LeaveOutcome, Player, PlayerTask, RoundAdvance,
    SessionOptions, SessionResults, SubmitOutcome, TaskType,
};
use crate::errors::domain::{ConflictKind, DomainError, ValidationKind};
use crate::repos::sessions;
use crate::services::room_locks::RoomLocks;
use crate::utils::join_code::{generate_join_code, normalize_code};
use crate::ws::broker::RealtimeBroker;
use crate::ws::protocol::RoomEvent;

/// Fresh codes tried before giving up on allocation.
const MAX_CODE_ATTEMPTS: usize = 10;
const MAX_MODE_CHARS: usize = 32;
const RETRY_STEP_MS: u64 = 5;
const RETRY_JITTER_MS: u64 = 10;

#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub host_nickname: String,
    pub account_id: Option<String>,
    pub total_rounds: Option<u32>,
    pub max_players: Option<u32>,
    pub mode: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    pub player_nickname: String,
    pub chain_id: usize,
    pub task_type: TaskType,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub all_submitted: bool,
    pub submitted_count: usize,
    pub total_players: usize,
    pub session: GameSession,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartResult {
    pub message: &'static str,
    pub session: GameSession,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaveResult {
    pub message: &'static str,
    /// Absent when the departure emptied the lobby and the room was deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<GameSession>,
}

/// Committed state after a mutation plus whatever the closure reported.
struct Mutation<T> {
    session: Option<GameSession>,
    value: T,
}

#[derive(Clone)]
pub struct SessionCoordinator {
    db: DatabaseConnection,
    realtime: Arc<RealtimeBroker>,
    settings: Arc<GameSettings>,
    room_locks: Arc<RoomLocks>,
}

impl SessionCoordinator {
    pub fn new(
        db: DatabaseConnection,
        realtime: Arc<RealtimeBroker>,
        settings: Arc<GameSettings>,
    ) -> Self {
        Self {
            db,
            realtime,
            settings,
            room_locks: Arc::new(RoomLocks::new()),
        }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub async fn create(&self, request: NewSession) -> Result<GameSession, DomainError> {
        let host_nickname = normalize_nickname(&request.host_nickname)?;
        let options = self.session_options(&request)?;
        let host = Player::new(host_nickname, request.account_id);

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_join_code(self.settings.code_length);
            let draft = GameSession::new(
                code.clone(),
                host.clone(),
                options.clone(),
                OffsetDateTime::now_utc(),
            );

            let created = with_txn(&self.db, move |txn| {
                Box::pin(async move {
                    if sessions::code_exists(txn, &draft.code).await? {
                        return Err(DomainError::conflict(
                            ConflictKind::JoinCodeConflict,
                            format!("Code {} is already in use", draft.code),
                        ));
                    }
                    sessions::create(txn, &draft).await
                })
            })
            .await;

            match created {
                Ok(session) => {
                    info!(
                        code = %session.code,
                        host = %session.host_id,
                        max_players = session.max_players,
                        "session created"
                    );
                    return Ok(session);
                }
                Err(DomainError::Conflict(ConflictKind::JoinCodeConflict, _)) => {
                    debug!(code = %code, attempt, "join code collision, re-rolling");
                }
                Err(err) => return Err(err),
            }
        }

        warn!(attempts = MAX_CODE_ATTEMPTS, "could not allocate a free join code");
        Err(DomainError::conflict(
            ConflictKind::JoinCodeConflict,
            "Could not allocate a unique session code",
        ))
    }

    fn session_options(&self, request: &NewSession) -> Result<SessionOptions, DomainError> {
        let max_players = request
            .max_players
            .unwrap_or(self.settings.default_max_players);
        if !(MIN_PLAYERS..=MAX_PLAYERS_LIMIT).contains(&max_players) {
            return Err(DomainError::validation(
                ValidationKind::InvalidConfig,
                format!("maxPlayers must be between {MIN_PLAYERS} and {MAX_PLAYERS_LIMIT}"),
            ));
        }
        if request.total_rounds == Some(0) {
            return Err(DomainError::validation(
                ValidationKind::InvalidConfig,
                "totalRounds must be at least 1",
            ));
        }
        let mode = match request.mode.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(mode) if mode.chars().count() > MAX_MODE_CHARS => {
                return Err(DomainError::validation(
                    ValidationKind::InvalidConfig,
                    format!("mode must be at most {MAX_MODE_CHARS} characters"),
                ))
            }
            Some(mode) => Some(mode.to_string()),
        };
        Ok(SessionOptions {
            total_rounds: request.total_rounds,
            max_players,
            mode,
        })
    }

    pub async fn get(&self, code: &str) -> Result<GameSession, DomainError> {
        let code = normalize_code(code)?;
        sessions::require_session(&self.db, &code).await
    }

    pub async fn join(
        &self,
        code: &str,
        nickname: &str,
        account_id: Option<String>,
    ) -> Result<GameSession, DomainError> {
        let code = normalize_code(code)?;
        let nickname = normalize_nickname(nickname)?;

        let joined = {
            let nickname = nickname.clone();
            self.mutate(&code, "join", move |session, _| {
                session.join(&nickname, account_id.clone())
            })
            .await?
        };
        let session = committed(&code, joined.session)?;

        info!(code = %code, nickname = %nickname, players = session.players.len(), "player joined");
        self.realtime.publish(
            &code,
            &RoomEvent::PlayerJoined {
                code: code.clone(),
                nickname,
                session: session.clone(),
            },
        );
        Ok(session)
    }

    pub async fn start(&self, code: &str) -> Result<StartResult, DomainError> {
        let code = normalize_code(code)?;
        let started = self
            .mutate(&code, "start", |session, _| session.start())
            .await?;
        let session = committed(&code, started.session)?;

        info!(
            code = %code,
            players = session.players.len(),
            total_rounds = session.total_rounds,
            "game started"
        );
        self.realtime.publish(
            &code,
            &RoomEvent::GameStarted {
                code: code.clone(),
                session: session.clone(),
            },
        );
        Ok(StartResult {
            message: "Game started",
            session,
        })
    }

    pub async fn task(&self, code: &str, nickname: &str) -> Result<PlayerTask, DomainError> {
        let session = self.get(code).await?;
        session.task_for(nickname)
    }

    pub async fn submit(&self, code: &str, entry: NewEntry) -> Result<SubmitResult, DomainError> {
        let code = normalize_code(code)?;
        let submitted = self
            .mutate(&code, "submit", move |session, now| {
                session.submit(
                    &entry.player_nickname,
                    entry.chain_id,
                    entry.task_type,
                    entry.data.clone(),
                    now,
                )
            })
            .await?;
        let session = committed(&code, submitted.session)?;
        let outcome: SubmitOutcome = submitted.value;

        info!(
            code = %code,
            nickname = %outcome.player_nickname,
            round = outcome.round,
            chain_id = outcome.chain_id,
            submitted = outcome.submitted_count,
            total = outcome.total_players,
            "entry submitted"
        );

        let mut events = vec![RoomEvent::PlayerSubmitted {
            code: code.clone(),
            nickname: outcome.player_nickname.clone(),
            round: outcome.round,
            submitted_count: outcome.submitted_count,
            total_players: outcome.total_players,
        }];
        events.extend(advance_event(&code, outcome.advance, &session));
        self.realtime.publish_all(&code, &events);

        Ok(SubmitResult {
            all_submitted: outcome.all_submitted,
            submitted_count: outcome.submitted_count,
            total_players: outcome.total_players,
            session,
        })
    }

    /// Voluntary departure.
    pub async fn leave(&self, code: &str, nickname: &str) -> Result<LeaveResult, DomainError> {
        self.depart(code, nickname, || false).await
    }

    /// Departure after a disconnect grace period. `reconnected` is checked
    /// under the room lock; when it holds the roster is left untouched.
    pub async fn leave_if_gone<R>(
        &self,
        code: &str,
        nickname: &str,
        reconnected: R,
    ) -> Result<LeaveResult, DomainError>
    where
        R: Fn() -> bool + Clone + Send + 'static,
    {
        self.depart(code, nickname, reconnected).await
    }

    async fn depart<R>(
        &self,
        code: &str,
        nickname: &str,
        keep: R,
    ) -> Result<LeaveResult, DomainError>
    where
        R: Fn() -> bool + Clone + Send + 'static,
    {
        let code = normalize_code(code)?;
        let nickname = nickname.to_string();
        let left = self
            .mutate(&code, "leave", move |session, now| {
                if keep() {
                    return Ok(None);
                }
                session.leave(&nickname, now).map(Some)
            })
            .await?;

        let (message, events) = match left.value {
            None => {
                debug!(code = %code, "player reconnected before departure");
                ("Still connected", Vec::new())
            }
            Some(LeaveOutcome::Removed { nickname, new_host }) => {
                info!(code = %code, nickname = %nickname, new_host = ?new_host, "player left lobby");
                let event = RoomEvent::PlayerLeft {
                    code: code.clone(),
                    nickname,
                    new_host,
                    session: left.session.clone(),
                };
                ("Left session", vec![event])
            }
            Some(LeaveOutcome::Emptied { nickname }) => {
                info!(code = %code, nickname = %nickname, "last player left, session deleted");
                let event = RoomEvent::PlayerLeft {
                    code: code.clone(),
                    nickname,
                    new_host: None,
                    session: None,
                };
                ("Left session; session closed", vec![event])
            }
            Some(LeaveOutcome::MarkedLeft { nickname, advance }) => {
                info!(code = %code, nickname = %nickname, advance = ?advance, "player left game");
                let mut events = vec![RoomEvent::PlayerLeft {
                    code: code.clone(),
                    nickname,
                    new_host: None,
                    session: left.session.clone(),
                }];
                if let Some(session) = &left.session {
                    events.extend(advance_event(&code, advance, session));
                }
                ("Left session", events)
            }
            Some(LeaveOutcome::Unchanged) => {
                debug!(code = %code, "leave had no effect");
                ("Already left", Vec::new())
            }
        };
        self.realtime.publish_all(&code, &events);

        Ok(LeaveResult {
            message,
            session: left.session,
        })
    }

    /// Force-finish. Already finished sessions are returned untouched.
    pub async fn end(&self, code: &str) -> Result<GameSession, DomainError> {
        let code = normalize_code(code)?;
        let ended = self
            .mutate(&code, "end", |session, now| Ok(session.finish(now)))
            .await?;
        let session = committed(&code, ended.session)?;

        if ended.value {
            info!(code = %code, round = session.current_round, "game ended early");
            self.realtime.publish(
                &code,
                &RoomEvent::GameEnded {
                    code: code.clone(),
                    session: session.clone(),
                },
            );
        }
        Ok(session)
    }

    pub async fn results(&self, code: &str) -> Result<SessionResults, DomainError> {
        self.get(code).await?.results()
    }

    /// Delete finished sessions that ended more than `retention` ago.
    pub async fn reap_finished(&self, retention: std::time::Duration) -> Result<u64, DomainError> {
        let cutoff = OffsetDateTime::now_utc() - retention;
        let removed = sessions::reap_finished(&self.db, cutoff).await?;
        if removed > 0 {
            info!(removed, "reaped finished sessions");
        }
        Ok(removed)
    }

    /// Run `apply` against the latest committed session inside one
    /// transaction, retrying from a fresh read when the write loses a race.
    ///
    /// Unchanged sessions are not written; a lobby emptied by `apply` is
    /// deleted instead of saved.
    async fn mutate<T, F>(
        &self,
        code: &str,
        action: &'static str,
        apply: F,
    ) -> Result<Mutation<T>, DomainError>
    where
        F: FnOnce(&mut GameSession, OffsetDateTime) -> Result<T, DomainError>
            + Clone
            + Send
            + 'static,
        T: Send + 'static,
    {
        let _room = self.room_locks.acquire(code).await;
        let budget = self.settings.retry_budget.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let code_owned = code.to_string();
            let apply = apply.clone();

            let result = with_txn(&self.db, move |txn| {
                Box::pin(async move {
                    let current = sessions::lock_session(txn, &code_owned).await?;
                    let mut next = current.clone();
                    let value = apply(&mut next, OffsetDateTime::now_utc())?;

                    let session = if next == current {
                        Some(current)
                    } else if next.is_abandoned() {
                        sessions::delete(txn, &current).await?;
                        None
                    } else {
                        Some(sessions::save(txn, &next).await?)
                    };
                    Ok(Mutation { session, value })
                })
            })
            .await;

            match result {
                Err(err) if err.is_retryable() && attempt < budget => {
                    debug!(code, action, attempt, error = %err, "write lost a race, retrying");
                    tokio::time::sleep(retry_backoff(attempt)).await;
                }
                Err(err) if err.is_retryable() => {
                    warn!(code, action, attempts = attempt, error = %err, "retry budget exhausted");
                    return Err(err);
                }
                other => return other,
            }
        }
    }
}

/// Linear step plus jitter so competing writers stop colliding in lockstep.
fn retry_backoff(attempt: u32) -> Duration {
    let jitter = rand::rng().random_range(0..=RETRY_JITTER_MS);
    Duration::from_millis(RETRY_STEP_MS * u64::from(attempt) + jitter)
}

/// Operations other than leave never delete the row.
fn committed(code: &str, session: Option<GameSession>) -> Result<GameSession, DomainError> {
    session.ok_or_else(|| DomainError::session_not_found(code))
}

fn advance_event(code: &str, advance: RoundAdvance, session: &GameSession) -> Option<RoomEvent> {
    match advance {
        RoundAdvance::Pending => None,
        RoundAdvance::NextRound(round) => {
            info!(code, round, "round advanced");
            Some(RoomEvent::NextRound {
                code: code.to_string(),
                round,
                session: session.clone(),
            })
        }
        RoundAdvance::Finished => {
            info!(code, "game finished");
            Some(RoomEvent::GameEnded {
                code: code.to_string(),
                session: session.clone(),
            })
        }
    }
}
