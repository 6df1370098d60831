//! Alpha-beta opponent
//!
//! Negamax search with alpha-beta pruning over the bitboard. Leaves are
//! scored by square weights plus mobility; finished games score as a win,
//! loss or draw for the side to move.

use rand::seq::SliceRandom;

use super::engine::Board;
use super::state::{GameState, Side, BOARD_CELLS};
use super::Bot;

/// Search depth used when none is configured
pub const DEFAULT_SEARCH_DEPTH: usize = 7;

/// Deepest search the server accepts
pub const MAX_SEARCH_DEPTH: usize = 12;

/// Score for a decided game, before the stone margin is added
const WIN_SCORE: i32 = 1_000_000;

/// Search window bound (negation-safe)
const INFINITY: i32 = i32::MAX;

/// Weight of one extra legal move
const MOBILITY_WEIGHT: i32 = 10;

#[rustfmt::skip]
const SQUARE_WEIGHTS: [i32; BOARD_CELLS] = [
    100, -20,  10,   5,   5,  10, -20, 100,
    -20, -50,  -2,  -2,  -2,  -2, -50, -20,
     10,  -2,  -1,  -1,  -1,  -1,  -2,  10,
      5,  -2,  -1,  -1,  -1,  -1,  -2,   5,
      5,  -2,  -1,  -1,  -1,  -1,  -2,   5,
     10,  -2,  -1,  -1,  -1,  -1,  -2,  10,
    -20, -50,  -2,  -2,  -2,  -2, -50, -20,
    100, -20,  10,   5,   5,  10, -20, 100,
];

fn positions(mask: u64) -> Vec<usize> {
    (0..BOARD_CELLS).filter(|i| mask >> i & 1 == 1).collect()
}

/// Fixed-depth alpha-beta bot
#[derive(Debug, Clone)]
pub struct AlphaBetaBot {
    depth: usize,
    randomize: bool,
}

impl AlphaBetaBot {
    /// Create a bot searching `depth` plies (at least one)
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            randomize: false,
        }
    }

    /// Shuffle root moves so equally scored replies vary between games
    pub fn with_randomize(mut self, randomize: bool) -> Self {
        self.randomize = randomize;
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn search(&self, board: &Board, side: Side, depth: usize, mut alpha: i32, beta: i32) -> i32 {
        if depth == 0 {
            return evaluate(board, side);
        }

        let moves = board.legal_moves(side);
        if moves == 0 {
            if board.legal_moves(side.opponent()) == 0 {
                return final_score(board, side);
            }
            return -self.search(board, side.opponent(), depth - 1, -beta, -alpha);
        }

        for position in positions(moves) {
            let Some(child) = board.play(side, position) else {
                continue;
            };
            let score = -self.search(&child, side.opponent(), depth - 1, -beta, -alpha);
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                break;
            }
        }
        alpha
    }
}

impl Default for AlphaBetaBot {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEPTH)
    }
}

impl Bot for AlphaBetaBot {
    fn select_move(&self, state: &GameState) -> Option<usize> {
        if state.ended() || !state.can_move() {
            return None;
        }

        let board = Board::from_state(state);
        let side = state.current_player();
        let mut moves = positions(state.legal_moves());
        if self.randomize {
            moves.shuffle(&mut rand::thread_rng());
        }

        let mut best_move = moves[0];
        let mut alpha = -INFINITY;
        for position in moves {
            let Some(child) = board.play(side, position) else {
                continue;
            };
            let score = -self.search(&child, side.opponent(), self.depth - 1, -INFINITY, -alpha);
            if score > alpha {
                alpha = score;
                best_move = position;
            }
        }
        Some(best_move)
    }
}

fn evaluate(board: &Board, side: Side) -> i32 {
    let weigh = |side: Side| -> i32 {
        positions(board.stones_of(side))
            .into_iter()
            .map(|i| SQUARE_WEIGHTS[i])
            .sum()
    };
    let mobility = board.legal_moves(side).count_ones() as i32
        - board.legal_moves(side.opponent()).count_ones() as i32;
    weigh(side) - weigh(side.opponent()) + MOBILITY_WEIGHT * mobility
}

fn final_score(board: &Board, side: Side) -> i32 {
    let margin = board.margin(side);
    margin.signum() * WIN_SCORE + margin
}

/// Always plays the lowest-numbered legal cell
#[cfg(test)]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FirstLegalBot;

#[cfg(test)]
impl Bot for FirstLegalBot {
    fn select_move(&self, state: &GameState) -> Option<usize> {
        state.playable().first().copied()
    }
}
