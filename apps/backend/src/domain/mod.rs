//! Domain layer: session aggregate and chain rotation, free of I/O.

pub mod rotation;
pub mod session;

pub use rotation::{assignment, chain_index_for, Assignment};
pub use session::{
    normalize_nickname, Chain, Entry, GameSession, LeaveOutcome, Player, PlayerState,
    PlayerTask, RoundAdvance, SessionOptions, SessionResults, SessionStatus, SubmitOutcome,
    TaskType,
};

#[cfg(test)]
mod test_helpers;
#[cfg(test)]
mod test_prelude;
#[cfg(test)]
mod tests_rotation;
#[cfg(test)]
mod tests_props_rotation;
#[cfg(test)]
mod tests_session;
