use crate::{Cell, InvalidObservation};
use std::collections::BTreeSet;
use std::fmt;

/// A single fact about the board: exactly `count` of `cells` are mines.
///
/// Cells are kept in an ordered set, so the derived `Eq` and `Hash` are
/// independent of insertion order and double as the dedup key of the
/// knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Constraint {
    cells: BTreeSet<Cell>,
    count: usize,
}

impl Constraint {
    /// The caller guarantees `count <= cells.len()`.
    pub fn new(cells: impl IntoIterator<Item = Cell>, count: usize) -> Self {
        Constraint {
            cells: cells.into_iter().collect(),
            count,
        }
    }

    pub fn cells(&self) -> &BTreeSet<Cell> {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// An empty constraint is vacuously true and carries no information.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, cell: &Cell) -> bool {
        self.cells.contains(cell)
    }

    pub fn is_subset_of(&self, other: &Constraint) -> bool {
        self.cells.is_subset(&other.cells)
    }

    /// Cells this constraint alone proves to be mines: all of them when
    /// every cell must be a mine, otherwise none.
    pub fn resolved_mines(&self) -> BTreeSet<Cell> {
        if self.count > 0 && self.count == self.cells.len() {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Cells this constraint alone proves to be safe.
    pub fn resolved_safe(&self) -> BTreeSet<Cell> {
        if self.count == 0 {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Removes a cell now known to be a mine, taking its mine with it.
    /// Returns whether the constraint changed.
    pub fn mark_mine(&mut self, cell: Cell) -> Result<bool, InvalidObservation> {
        if !self.cells.contains(&cell) {
            return Ok(false);
        }
        if self.count == 0 {
            return Err(self.inconsistent(-1));
        }
        self.cells.remove(&cell);
        self.count -= 1;
        Ok(true)
    }

    /// Removes a cell now known to be safe. The count is unchanged.
    pub fn mark_safe(&mut self, cell: Cell) -> Result<bool, InvalidObservation> {
        if !self.cells.contains(&cell) {
            return Ok(false);
        }
        if self.count == self.cells.len() {
            return Err(self.inconsistent(self.count as isize));
        }
        self.cells.remove(&cell);
        Ok(true)
    }

    /// Subsumption: with `subset.cells` inside `self.cells`, the cells only
    /// `self` mentions hold exactly `self.count - subset.count` mines.
    pub fn subtract(&self, subset: &Constraint) -> Result<Constraint, InvalidObservation> {
        debug_assert!(subset.is_subset_of(self));

        let cells: BTreeSet<Cell> = self.cells.difference(&subset.cells).copied().collect();
        let count = self.count as isize - subset.count as isize;
        if count < 0 || count as usize > cells.len() {
            return Err(InvalidObservation::Inconsistent {
                cells: cells.into_iter().collect(),
                count,
            });
        }

        Ok(Constraint {
            cells,
            count: count as usize,
        })
    }

    fn inconsistent(&self, count: isize) -> InvalidObservation {
        InvalidObservation::Inconsistent {
            cells: self.cells.iter().copied().collect(),
            count,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{cell}")?;
        }
        write!(f, "}} = {}", self.count)
    }
}
