//! Immutable game snapshots
//!
//! A `GameState` is produced by an `Engine` after every move or pass and is
//! never mutated afterwards. Scores are derived from the cells when the
//! snapshot is built, so `black + white + empty == 64` always holds.

use serde::{Deserialize, Serialize};

/// Number of cells on the board
pub const BOARD_CELLS: usize = 64;

/// Contents of a single board cell
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Empty,
    Black,
    White,
}

impl From<Side> for Cell {
    fn from(side: Side) -> Self {
        match side {
            Side::Black => Cell::Black,
            Side::White => Cell::White,
        }
    }
}

/// One of the two players
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Black,
    White,
}

impl Side {
    /// The other player
    pub fn opponent(self) -> Self {
        match self {
            Side::Black => Side::White,
            Side::White => Side::Black,
        }
    }

    /// Display name used in status text
    pub fn name(self) -> &'static str {
        match self {
            Side::Black => "Black",
            Side::White => "White",
        }
    }
}

/// Authoritative snapshot of one game after a move or pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    cells: [Cell; BOARD_CELLS],
    black_score: u8,
    white_score: u8,
    current_player: Side,
    legal_moves: u64,
    ended: bool,
}

impl GameState {
    /// Build a snapshot. Only engines (and test engines) call this.
    ///
    /// `legal_moves` is the bitmask of positions open to `current_player`.
    pub(crate) fn new(
        cells: [Cell; BOARD_CELLS],
        current_player: Side,
        legal_moves: u64,
        ended: bool,
    ) -> Self {
        let black_score = cells.iter().filter(|c| **c == Cell::Black).count() as u8;
        let white_score = cells.iter().filter(|c| **c == Cell::White).count() as u8;
        Self {
            cells,
            black_score,
            white_score,
            current_player,
            legal_moves,
            ended,
        }
    }

    pub fn cells(&self) -> &[Cell; BOARD_CELLS] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Cell {
        self.cells[index]
    }

    pub fn black_score(&self) -> u8 {
        self.black_score
    }

    pub fn white_score(&self) -> u8 {
        self.white_score
    }

    /// Whose turn is next (meaningless once the game has ended)
    pub fn current_player(&self) -> Side {
        self.current_player
    }

    /// Whether the current player has at least one legal move
    pub fn can_move(&self) -> bool {
        self.legal_moves != 0
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    /// Bitmask of legal positions for the current player
    pub fn legal_moves(&self) -> u64 {
        self.legal_moves
    }

    /// Whether `position` is a legal move for the current player
    pub fn is_legal(&self, position: usize) -> bool {
        position < BOARD_CELLS && self.legal_moves >> position & 1 == 1
    }

    /// Legal positions for the current player, ascending
    pub fn playable(&self) -> Vec<usize> {
        (0..BOARD_CELLS).filter(|i| self.is_legal(*i)).collect()
    }

    #[allow(dead_code)]
    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == Cell::Empty).count()
    }

    /// Winner of a finished game; `None` for a draw or a game in progress
    pub fn winner(&self) -> Option<Side> {
        if !self.ended {
            return None;
        }
        match self.black_score.cmp(&self.white_score) {
            std::cmp::Ordering::Greater => Some(Side::Black),
            std::cmp::Ordering::Less => Some(Side::White),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(black: &[usize], white: &[usize]) -> [Cell; BOARD_CELLS] {
        let mut cells = [Cell::Empty; BOARD_CELLS];
        for &i in black {
            cells[i] = Cell::Black;
        }
        for &i in white {
            cells[i] = Cell::White;
        }
        cells
    }

    #[test]
    fn test_scores_derived_from_cells() {
        let state = GameState::new(board_with(&[0, 1, 2], &[10]), Side::White, 0, false);
        assert_eq!(state.black_score(), 3);
        assert_eq!(state.white_score(), 1);
        assert_eq!(
            state.black_score() as usize + state.white_score() as usize + state.empty_count(),
            BOARD_CELLS
        );
    }

    #[test]
    fn test_legal_move_queries() {
        let mask = 1u64 << 19 | 1u64 << 44;
        let state = GameState::new(board_with(&[], &[]), Side::Black, mask, false);
        assert!(state.can_move());
        assert!(state.is_legal(19));
        assert!(!state.is_legal(20));
        assert!(!state.is_legal(64));
        assert_eq!(state.playable(), vec![19, 44]);
    }

    #[test]
    fn test_winner_only_when_ended() {
        let cells = board_with(&[0, 1], &[2]);
        assert_eq!(GameState::new(cells, Side::Black, 0, false).winner(), None);
        assert_eq!(GameState::new(cells, Side::Black, 0, true).winner(), Some(Side::Black));

        let draw = board_with(&[0], &[1]);
        assert_eq!(GameState::new(draw, Side::White, 0, true).winner(), None);
    }

    #[test]
    fn test_side_serialization() {
        assert_eq!(serde_json::to_string(&Side::White).unwrap(), "\"white\"");
        assert_eq!(serde_json::to_string(&Cell::Empty).unwrap(), "\"empty\"");
        assert_eq!(Side::Black.opponent(), Side::White);
        assert_eq!(Cell::from(Side::White), Cell::White);
    }
}
