//! Game rules and automated opponent
//!
//! The session layer only talks to the rules through [`Engine`] and to the
//! opponent through [`Bot`]. `OthelloEngine` and `AlphaBetaBot` are the
//! implementations the server runs with.

mod bot;
mod engine;
mod state;

use thiserror::Error;

pub use bot::*;
pub use engine::*;
pub use state::*;

/// Errors returned by an engine when asked to do something the rules forbid
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Illegal move at position {0}")]
    IllegalMove(usize),

    #[error("Position {0} is off the board")]
    OutOfRange(usize),

    #[error("Pass not allowed while a legal move exists")]
    PassNotAllowed,

    #[error("Game is already over")]
    GameOver,
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Rules authority: the only producer of `GameState` values
pub trait Engine: Send + Sync {
    /// Fresh game in the standard opening position
    fn initial(&self) -> GameState;

    /// Play `position` for the current player
    fn apply_move(&self, state: &GameState, position: usize) -> EngineResult<GameState>;

    /// Skip the current player's turn; valid only when it has no legal move
    fn apply_pass(&self, state: &GameState) -> EngineResult<GameState>;
}

/// Move selection for the automated side
pub trait Bot: Send + Sync {
    /// Pick a position for the current player, or `None` when it has no legal move
    fn select_move(&self, state: &GameState) -> Option<usize>;
}
