//! Game sessions
//!
//! Keeps one authoritative game per session id, drives human and bot turns
//! forward, and turns each transition into client updates.

mod diff;
mod orchestrator;
mod store;

use thiserror::Error;

pub use diff::*;
pub use orchestrator::*;
pub use store::*;

/// Why a human intent was refused without touching the game
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("the game is already over")]
    GameOver,

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("no legal move is available, you must pass")]
    MustPass,

    #[error("cannot pass while a legal move is available")]
    PassWithMovesAvailable,

    #[error("position {0} is not a legal move")]
    IllegalMove(usize),
}

/// Errors that can occur while handling a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("Session {id} failed and must be reset: {reason}")]
    SessionFailed { id: SessionId, reason: String },

    #[error("Illegal intent: {0}")]
    IllegalIntent(RejectReason),

    #[error("Session {0} is busy with another move")]
    Busy(SessionId),

    #[error("Contract violation: {0}")]
    ContractViolation(String),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
