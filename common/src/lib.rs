pub mod agent;
pub mod board;
pub mod constraint;
pub mod entailment;
pub mod error;
pub mod game;

pub use agent::{Agent, CellStatus, Move};
pub use board::Board;
pub use constraint::Constraint;
pub use entailment::{DeducedState, Observation, analyze, audit, observation_constraints};
pub use error::InvalidObservation;
pub use game::{Game, GameState, Tile};

use std::fmt;

/// A coordinate on the board, addressed as (row, column).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Cell { row, col }
    }
}

impl From<(usize, usize)> for Cell {
    fn from((row, col): (usize, usize)) -> Self {
        Cell { row, col }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// All in-bounds 8-connected neighbours of `cell`, excluding `cell` itself.
/// Board edges and corners are handled here so callers never see an
/// out-of-range coordinate.
pub fn neighbors(cell: Cell, height: usize, width: usize) -> impl Iterator<Item = Cell> {
    (-1..=1).flat_map(move |dr| {
        (-1..=1).filter_map(move |dc| {
            if dr == 0 && dc == 0 {
                return None;
            }

            let r = cell.row as isize + dr;
            let c = cell.col as isize + dc;

            if r >= 0 && r < height as isize && c >= 0 && c < width as isize {
                Some(Cell {
                    row: r as usize,
                    col: c as usize,
                })
            } else {
                None
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_neighbors() {
        // Corner cell should have 3 neighbors
        assert_eq!(neighbors(Cell::new(0, 0), 3, 3).count(), 3);

        // Center cell should have 8 neighbors
        assert_eq!(neighbors(Cell::new(1, 1), 3, 3).count(), 8);

        // Edge cell should have 5 neighbors
        assert_eq!(neighbors(Cell::new(0, 1), 3, 3).count(), 5);
    }

    #[test]
    fn test_neighbors_exclude_self_and_respect_shape() {
        let around: Vec<Cell> = neighbors(Cell::new(0, 2), 2, 3).collect();
        assert_eq!(
            around,
            vec![Cell::new(0, 1), Cell::new(1, 1), Cell::new(1, 2)]
        );
        assert!(!around.contains(&Cell::new(0, 2)));
    }

    #[test]
    fn test_single_cell_board_has_no_neighbors() {
        assert_eq!(neighbors(Cell::new(0, 0), 1, 1).count(), 0);
    }
}
