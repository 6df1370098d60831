//! Bitboard Othello rules engine
//!
//! Two `u64` masks hold the stones, bit `i` being cell `i` in row-major
//! order. Move generation propagates along the eight directions with
//! shift-and-mask steps; the column masks stop runs wrapping between rows.

use super::state::{Cell, GameState, Side, BOARD_CELLS};
use super::{Engine, EngineError, EngineResult};

/// Every column except the leftmost
const NOT_COL0: u64 = 0xfefe_fefe_fefe_fefe;
/// Every column except the rightmost
const NOT_COL7: u64 = 0x7f7f_7f7f_7f7f_7f7f;

/// Number of propagation directions
const DIRECTIONS: usize = 8;

/// Shift every stone one step in direction `dir` (0..8), dropping wrap-arounds
#[inline]
fn shift(bits: u64, dir: usize) -> u64 {
    match dir {
        0 => (bits << 1) & NOT_COL0, // east
        1 => (bits >> 1) & NOT_COL7, // west
        2 => bits << 8,              // south
        3 => bits >> 8,              // north
        4 => (bits << 9) & NOT_COL0, // south-east
        5 => (bits << 7) & NOT_COL7, // south-west
        6 => (bits >> 7) & NOT_COL0, // north-east
        _ => (bits >> 9) & NOT_COL7, // north-west
    }
}

/// Raw board position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    black: u64,
    white: u64,
}

impl Board {
    pub const fn new(black: u64, white: u64) -> Self {
        Self { black, white }
    }

    /// Standard opening: Black on 28 and 35, White on 27 and 36
    pub const fn initial() -> Self {
        Self::new(1 << 28 | 1 << 35, 1 << 27 | 1 << 36)
    }

    /// Rebuild the bitboards from a snapshot's cells
    pub fn from_state(state: &GameState) -> Self {
        let mut board = Self::new(0, 0);
        for (i, cell) in state.cells().iter().enumerate() {
            match cell {
                Cell::Black => board.black |= 1 << i,
                Cell::White => board.white |= 1 << i,
                Cell::Empty => {}
            }
        }
        board
    }

    /// Stones owned by `side`
    pub fn stones_of(&self, side: Side) -> u64 {
        match side {
            Side::Black => self.black,
            Side::White => self.white,
        }
    }

    /// `(own, opponent)` stones for `side`
    fn stones(&self, side: Side) -> (u64, u64) {
        (self.stones_of(side), self.stones_of(side.opponent()))
    }

    pub fn empty(&self) -> u64 {
        !(self.black | self.white)
    }

    /// Bitmask of legal positions for `side`
    pub fn legal_moves(&self, side: Side) -> u64 {
        let (own, opp) = self.stones(side);
        let empty = self.empty();
        let mut moves = 0;
        for dir in 0..DIRECTIONS {
            let mut run = shift(own, dir) & opp;
            // A bracketed run is at most six stones long
            for _ in 0..5 {
                run |= shift(run, dir) & opp;
            }
            moves |= shift(run, dir) & empty;
        }
        moves
    }

    /// Stones flipped by `side` playing at `position` (0 if not a capture)
    pub fn flips(&self, side: Side, position: usize) -> u64 {
        let (own, opp) = self.stones(side);
        let placed = 1u64 << position;
        if placed & !self.empty() != 0 {
            return 0;
        }
        let mut flipped = 0;
        for dir in 0..DIRECTIONS {
            let mut run = 0;
            let mut cursor = shift(placed, dir);
            while cursor & opp != 0 {
                run |= cursor;
                cursor = shift(cursor, dir);
            }
            if cursor & own != 0 {
                flipped |= run;
            }
        }
        flipped
    }

    /// Board after `side` plays at `position`, or `None` if the move is illegal
    pub fn play(&self, side: Side, position: usize) -> Option<Self> {
        if position >= BOARD_CELLS {
            return None;
        }
        let flipped = self.flips(side, position);
        if flipped == 0 {
            return None;
        }
        let placed = 1u64 << position;
        Some(match side {
            Side::Black => Self::new(self.black | placed | flipped, self.white & !flipped),
            Side::White => Self::new(self.black & !flipped, self.white | placed | flipped),
        })
    }

    /// Stone difference from `side`'s point of view
    pub fn margin(&self, side: Side) -> i32 {
        let (own, opp) = self.stones(side);
        own.count_ones() as i32 - opp.count_ones() as i32
    }

    /// Freeze this position into a snapshot with `to_move` next
    pub fn snapshot(&self, to_move: Side) -> GameState {
        let mut cells = [Cell::Empty; BOARD_CELLS];
        for (i, cell) in cells.iter_mut().enumerate() {
            if self.black >> i & 1 == 1 {
                *cell = Cell::Black;
            } else if self.white >> i & 1 == 1 {
                *cell = Cell::White;
            }
        }
        let moves = self.legal_moves(to_move);
        let ended = moves == 0 && self.legal_moves(to_move.opponent()) == 0;
        GameState::new(cells, to_move, moves, ended)
    }
}

/// Standard 8x8 Othello rules
#[derive(Debug, Default, Clone, Copy)]
pub struct OthelloEngine;

impl OthelloEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for OthelloEngine {
    fn initial(&self) -> GameState {
        Board::initial().snapshot(Side::Black)
    }

    fn apply_move(&self, state: &GameState, position: usize) -> EngineResult<GameState> {
        if state.ended() {
            return Err(EngineError::GameOver);
        }
        if position >= BOARD_CELLS {
            return Err(EngineError::OutOfRange(position));
        }
        let side = state.current_player();
        let next = Board::from_state(state)
            .play(side, position)
            .ok_or(EngineError::IllegalMove(position))?;
        Ok(next.snapshot(side.opponent()))
    }

    fn apply_pass(&self, state: &GameState) -> EngineResult<GameState> {
        if state.ended() {
            return Err(EngineError::GameOver);
        }
        if state.can_move() {
            return Err(EngineError::PassNotAllowed);
        }
        let side = state.current_player();
        Ok(Board::from_state(state).snapshot(side.opponent()))
    }
}
