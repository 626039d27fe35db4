use crate::{Cell, neighbors};
use itertools::Itertools;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::BTreeSet;
use std::fmt;

/// The ground truth: where the mines actually are.
///
/// The agent never looks at this directly. It only ever hears the counts
/// the game loop reads off the board.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Board {
    height: usize,
    width: usize,
    mines: BTreeSet<Cell>,
}

impl Board {
    /// Places exactly `mines` mines uniformly at random.
    pub fn new<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        mines: usize,
        rng: &mut R,
    ) -> anyhow::Result<Self> {
        if height == 0 || width == 0 {
            anyhow::bail!("board must have at least one row and one column");
        }
        if mines >= height * width {
            anyhow::bail!("total mines must be less than the number of cells on the board");
        }

        let cells: Vec<Cell> = Self::all_cells(height, width).collect();
        let mines = cells.choose_multiple(rng, mines).copied().collect();

        Ok(Board {
            height,
            width,
            mines,
        })
    }

    /// A board with a fixed mine layout.
    pub fn with_mines(
        height: usize,
        width: usize,
        mines: impl IntoIterator<Item = Cell>,
    ) -> anyhow::Result<Self> {
        if height == 0 || width == 0 {
            anyhow::bail!("board must have at least one row and one column");
        }

        let board = Board {
            height,
            width,
            mines: mines.into_iter().collect(),
        };
        if let Some(cell) = board.mines.iter().find(|&&cell| !board.in_bounds(cell)) {
            anyhow::bail!("mine {cell} is outside the {height}x{width} board");
        }

        Ok(board)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn mines(&self) -> &BTreeSet<Cell> {
        &self.mines
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row < self.height && cell.col < self.width
    }

    pub fn is_mine(&self, cell: Cell) -> bool {
        self.mines.contains(&cell)
    }

    /// Number of mines among the 8-connected neighbours, not counting `cell`.
    pub fn neighbor_mine_count(&self, cell: Cell) -> u8 {
        neighbors(cell, self.height, self.width)
            .filter(|n| self.is_mine(*n))
            .count() as u8
    }

    /// Every cell on the board in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + use<> {
        Self::all_cells(self.height, self.width)
    }

    fn all_cells(height: usize, width: usize) -> impl Iterator<Item = Cell> {
        (0..height).cartesian_product(0..width).map(Cell::from)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(self.width * 2 + 1);
        for row in 0..self.height {
            writeln!(f, "{rule}")?;
            for col in 0..self.width {
                let mark = if self.is_mine(Cell::new(row, col)) { 'X' } else { ' ' };
                write!(f, "|{mark}")?;
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "{rule}")
    }
}
