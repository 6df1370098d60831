//! Turn orchestration
//!
//! Applies one human intent, then keeps playing on the automated side (and
//! passing for a stuck human) until the human has a move or the game ends.
//! Every transition's updates are delivered before the next engine call, so
//! the client sees each intermediate board.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use super::diff::{DiffBroadcaster, UpdateEvent};
use super::{RejectReason, SessionError, SessionResult};
use crate::game::{Bot, Engine, EngineError, GameState, Side, BOARD_CELLS};

/// The side the connected player controls
pub const HUMAN_SIDE: Side = Side::Black;

/// Canonical wire value for an explicit pass
#[allow(dead_code)]
pub const PASS_SENTINEL: i32 = -1;

/// A move request from the human player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Place(usize),
    Pass,
}

impl Intent {
    /// Decode a wire position: negative means pass, 0..64 a cell
    pub fn from_position(position: i32) -> Option<Self> {
        if position < 0 {
            Some(Intent::Pass)
        } else if (position as usize) < BOARD_CELLS {
            Some(Intent::Place(position as usize))
        } else {
            None
        }
    }
}

/// Destination for the updates of each transition
///
/// Delivery is best effort: a sink whose client went away drops events and
/// the run carries on.
pub trait UpdateSink: Send {
    fn deliver(&mut self, events: Vec<UpdateEvent>) -> impl Future<Output = ()> + Send;
}

/// Drives a game between the human and the bot
pub struct TurnOrchestrator {
    engine: Arc<dyn Engine>,
    bot: Arc<dyn Bot>,
    broadcaster: DiffBroadcaster,
}

fn violation(context: &'static str) -> impl Fn(EngineError) -> SessionError {
    move |err| SessionError::ContractViolation(format!("{context}: {err}"))
}

impl TurnOrchestrator {
    pub fn new(engine: Arc<dyn Engine>, bot: Arc<dyn Bot>) -> Self {
        Self {
            engine,
            bot,
            broadcaster: DiffBroadcaster::new(HUMAN_SIDE),
        }
    }

    pub fn broadcaster(&self) -> &DiffBroadcaster {
        &self.broadcaster
    }

    /// Check a human intent against the current state
    pub fn check_intent(&self, state: &GameState, intent: Intent) -> Result<(), RejectReason> {
        if state.ended() {
            return Err(RejectReason::GameOver);
        }
        if state.current_player() != HUMAN_SIDE {
            return Err(RejectReason::NotYourTurn);
        }
        match intent {
            Intent::Pass if state.can_move() => Err(RejectReason::PassWithMovesAvailable),
            Intent::Pass => Ok(()),
            Intent::Place(_) if !state.can_move() => Err(RejectReason::MustPass),
            Intent::Place(position) if !state.is_legal(position) => {
                Err(RejectReason::IllegalMove(position))
            }
            Intent::Place(_) => Ok(()),
        }
    }

    /// Apply a human intent and run the automated side to its stopping point
    ///
    /// Returns the state to commit. A rejected intent returns
    /// `IllegalIntent` before anything is delivered.
    pub async fn play<S: UpdateSink>(
        &self,
        state: &GameState,
        intent: Intent,
        sink: &mut S,
    ) -> SessionResult<GameState> {
        self.check_intent(state, intent)
            .map_err(SessionError::IllegalIntent)?;

        let next = match intent {
            Intent::Place(position) => self.engine.apply_move(state, position),
            Intent::Pass => self.engine.apply_pass(state),
        }
        .map_err(violation("engine rejected a validated human intent"))?;
        debug!("Human played {:?}", intent);
        self.emit(state, &next, sink).await;

        self.advance(next, sink).await
    }

    /// Play bot turns and forced human passes until the human can move or the game ends
    pub async fn advance<S: UpdateSink>(
        &self,
        mut state: GameState,
        sink: &mut S,
    ) -> SessionResult<GameState> {
        while !state.ended() {
            let next = if state.current_player() == HUMAN_SIDE {
                if state.can_move() {
                    break;
                }
                debug!("Human has no legal move, passing on their behalf");
                self.engine
                    .apply_pass(&state)
                    .map_err(violation("engine refused a forced pass"))?
            } else {
                self.automated_turn(&state).await?
            };
            self.emit(&state, &next, sink).await;
            state = next;
        }
        Ok(state)
    }

    async fn automated_turn(&self, state: &GameState) -> SessionResult<GameState> {
        let choice = self.select_move(state).await?;
        match (choice, state.can_move()) {
            (Some(position), true) => {
                debug!("Bot plays {}", position);
                self.engine
                    .apply_move(state, position)
                    .map_err(violation("bot move rejected by engine"))
            }
            (None, false) => {
                debug!("Bot has no legal move, passing");
                self.engine
                    .apply_pass(state)
                    .map_err(violation("engine refused the bot's pass"))
            }
            (Some(position), false) => Err(SessionError::ContractViolation(format!(
                "bot chose {position} but has no legal move"
            ))),
            (None, true) => Err(SessionError::ContractViolation(
                "bot returned no move while a legal move exists".to_string(),
            )),
        }
    }

    /// Run the search off the async workers; it is CPU-bound
    async fn select_move(&self, state: &GameState) -> SessionResult<Option<usize>> {
        let bot = Arc::clone(&self.bot);
        let snapshot = state.clone();
        tokio::task::spawn_blocking(move || bot.select_move(&snapshot))
            .await
            .map_err(|e| SessionError::ContractViolation(format!("bot task failed: {e}")))
    }

    async fn emit<S: UpdateSink>(&self, prev: &GameState, next: &GameState, sink: &mut S) {
        let events = self.broadcaster.diff(prev, next);
        debug!(
            "Transition to {:?} ({}-{}), {} updates",
            next.current_player(),
            next.black_score(),
            next.white_score(),
            events.len()
        );
        sink.deliver(events).await;
    }
}
