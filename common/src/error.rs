use crate::Cell;
use std::fmt;

/// A precondition violated by the caller of the inference engine.
///
/// These are programming errors on the game-loop side (or a board that
/// lies about its counts). The engine refuses the input instead of
/// folding it into the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidObservation {
    /// The cell lies outside the `height x width` grid.
    OutOfBounds {
        cell: Cell,
        height: usize,
        width: usize,
    },
    /// More mines were reported than the cell has neighbours.
    CountTooLarge {
        cell: Cell,
        count: u8,
        neighbors: usize,
    },
    /// The cell would be both a mine and safe.
    Contradiction { cell: Cell },
    /// A constraint ended up with a count it can never satisfy.
    Inconsistent {
        cells: Vec<Cell>,
        count: isize,
    },
}

impl fmt::Display for InvalidObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidObservation::OutOfBounds {
                cell,
                height,
                width,
            } => write!(f, "cell {cell} is outside the {height}x{width} board"),
            InvalidObservation::CountTooLarge {
                cell,
                count,
                neighbors,
            } => write!(
                f,
                "cell {cell} reports {count} adjacent mines but has only {neighbors} neighbors"
            ),
            InvalidObservation::Contradiction { cell } => {
                write!(f, "cell {cell} cannot be both a mine and safe")
            }
            InvalidObservation::Inconsistent { cells, count } => {
                write!(f, "unsatisfiable constraint: {count} mines among {{")?;
                for (i, cell) in cells.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{cell}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl std::error::Error for InvalidObservation {}
