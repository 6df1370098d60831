//! Board diffing
//!
//! Turns two consecutive snapshots into the minimal list of client updates:
//! changed cells in ascending index order, then scores, then status, then
//! the human's playable cells.

use serde::{Deserialize, Serialize};

use crate::game::{Cell, GameState, Side, BOARD_CELLS};

/// Display status derived from `{ended, current_player}` and the scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    /// Game in progress, `Side` to move
    Turn(Side),
    /// Game over with a winner
    Won(Side),
    /// Game over, equal stones
    Draw,
}

impl Standing {
    pub fn of(state: &GameState) -> Self {
        if state.ended() {
            match state.winner() {
                Some(side) => Standing::Won(side),
                None => Standing::Draw,
            }
        } else {
            Standing::Turn(state.current_player())
        }
    }

    pub fn ended(&self) -> bool {
        !matches!(self, Standing::Turn(_))
    }

    /// Status line shown to the player
    pub fn message(&self) -> String {
        match self {
            Standing::Turn(side) => format!("{} turn", side.name()),
            Standing::Won(side) => format!("{} won!", side.name()),
            Standing::Draw => "Game draw!".to_string(),
        }
    }
}

/// One unit of change pushed to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    Cell { index: usize, value: Cell },
    Score { black: u8, white: u8 },
    Status(StandingView),
    Hints { positions: Vec<usize> },
}

/// Wire-friendly form of a [`Standing`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingView {
    pub ended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_player: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
    pub message: String,
}

impl From<Standing> for StandingView {
    fn from(standing: Standing) -> Self {
        let (current_player, winner) = match standing {
            Standing::Turn(side) => (Some(side), None),
            Standing::Won(side) => (None, Some(side)),
            Standing::Draw => (None, None),
        };
        Self {
            ended: standing.ended(),
            current_player,
            winner,
            message: standing.message(),
        }
    }
}

/// Computes update events between snapshots for one human side
#[derive(Debug, Clone, Copy)]
pub struct DiffBroadcaster {
    human: Side,
}

impl DiffBroadcaster {
    pub fn new(human: Side) -> Self {
        Self { human }
    }

    /// Cells the human may play in `state` (empty unless it is their turn)
    pub fn hints(&self, state: &GameState) -> Vec<usize> {
        if !state.ended() && state.current_player() == self.human {
            state.playable()
        } else {
            Vec::new()
        }
    }

    /// Updates that turn `prev` into `next` on the client
    pub fn diff(&self, prev: &GameState, next: &GameState) -> Vec<UpdateEvent> {
        let mut events: Vec<UpdateEvent> = (0..BOARD_CELLS)
            .filter(|i| prev.cell(*i) != next.cell(*i))
            .map(|index| UpdateEvent::Cell {
                index,
                value: next.cell(index),
            })
            .collect();

        if prev.black_score() != next.black_score() || prev.white_score() != next.white_score() {
            events.push(UpdateEvent::Score {
                black: next.black_score(),
                white: next.white_score(),
            });
        }

        let standing = Standing::of(next);
        if Standing::of(prev) != standing {
            events.push(UpdateEvent::Status(standing.into()));
        }

        let hints = self.hints(next);
        if self.hints(prev) != hints {
            events.push(UpdateEvent::Hints { positions: hints });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Engine, OthelloEngine};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;

    fn random_cells(rng: &mut StdRng) -> [Cell; BOARD_CELLS] {
        let mut cells = [Cell::Empty; BOARD_CELLS];
        for cell in cells.iter_mut() {
            *cell = match rng.gen_range(0..3) {
                0 => Cell::Empty,
                1 => Cell::Black,
                _ => Cell::White,
            };
        }
        cells
    }

    #[test]
    fn test_identical_states_produce_nothing() {
        let state = OthelloEngine.initial();
        assert!(DiffBroadcaster::new(Side::Black).diff(&state, &state).is_empty());
    }

    #[test]
    fn test_opening_move_diff_order() {
        let engine = OthelloEngine;
        let prev = engine.initial();
        let next = engine.apply_move(&prev, 44).unwrap();
        let events = DiffBroadcaster::new(Side::Black).diff(&prev, &next);

        assert_eq!(
            events,
            vec![
                UpdateEvent::Cell { index: 36, value: Cell::Black },
                UpdateEvent::Cell { index: 44, value: Cell::Black },
                UpdateEvent::Score { black: 4, white: 1 },
                UpdateEvent::Status(StandingView {
                    ended: false,
                    current_player: Some(Side::White),
                    winner: None,
                    message: "White turn".to_string(),
                }),
                UpdateEvent::Hints { positions: vec![] },
            ]
        );
    }

    #[test]
    fn test_pass_only_changes_status() {
        let engine = OthelloEngine;
        let stuck = crate::game::Board::new(1 << 9, 1 << 0).snapshot(Side::Black);
        let passed = engine.apply_pass(&stuck).unwrap();
        let events = DiffBroadcaster::new(Side::Black).diff(&stuck, &passed);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], UpdateEvent::Status(view) if view.current_player == Some(Side::White)));
    }

    #[test]
    fn test_cell_updates_match_positional_difference() {
        let mut rng = StdRng::seed_from_u64(42);
        let broadcaster = DiffBroadcaster::new(Side::Black);
        for _ in 0..200 {
            let a = random_cells(&mut rng);
            let b = random_cells(&mut rng);
            let prev = GameState::new(a, Side::Black, 0, false);
            let next = GameState::new(b, Side::White, 0, false);

            let emitted: Vec<usize> = broadcaster
                .diff(&prev, &next)
                .into_iter()
                .filter_map(|e| match e {
                    UpdateEvent::Cell { index, value } => {
                        assert_eq!(value, b[index]);
                        Some(index)
                    }
                    _ => None,
                })
                .collect();
            let expected: Vec<usize> = (0..BOARD_CELLS).filter(|i| a[*i] != b[*i]).collect();

            assert_eq!(emitted, expected);
            let unique: BTreeSet<usize> = emitted.iter().copied().collect();
            assert_eq!(unique.len(), emitted.len());
        }
    }

    #[test]
    fn test_score_update_carries_both_scores() {
        let mut a = [Cell::Empty; BOARD_CELLS];
        a[0] = Cell::Black;
        let mut b = a;
        b[1] = Cell::Black;
        let prev = GameState::new(a, Side::Black, 1, false);
        let next = GameState::new(b, Side::Black, 1, false);
        let events = DiffBroadcaster::new(Side::Black).diff(&prev, &next);
        assert_eq!(
            events,
            vec![
                UpdateEvent::Cell { index: 1, value: Cell::Black },
                UpdateEvent::Score { black: 2, white: 0 },
            ]
        );
    }

    #[test]
    fn test_game_end_status() {
        let mut cells = [Cell::Empty; BOARD_CELLS];
        cells[0] = Cell::White;
        cells[1] = Cell::White;
        let prev = GameState::new(cells, Side::Black, 0, false);
        let next = GameState::new(cells, Side::White, 0, true);
        let events = DiffBroadcaster::new(Side::Black).diff(&prev, &next);
        assert_eq!(
            events,
            vec![UpdateEvent::Status(StandingView {
                ended: true,
                current_player: None,
                winner: Some(Side::White),
                message: "White won!".to_string(),
            })]
        );
    }

    #[test]
    fn test_standing_messages() {
        assert_eq!(Standing::Turn(Side::Black).message(), "Black turn");
        assert_eq!(Standing::Won(Side::Black).message(), "Black won!");
        assert_eq!(Standing::Draw.message(), "Game draw!");
        assert!(Standing::Draw.ended());
    }
}
