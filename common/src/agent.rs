use crate::{Cell, Constraint, InvalidObservation, neighbors};
use itertools::Itertools;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

/// What the agent currently knows about a single cell.
/// Transitions are monotonic: `Unknown` becomes `Safe` or `Mine`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Unknown,
    Safe,
    Mine,
}

/// A move chosen by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Move {
    /// The cell is known to be safe.
    Safe(Cell),
    /// Nothing is known to be safe; the cell was picked at random.
    Guess(Cell),
}

impl Move {
    pub fn cell(&self) -> Cell {
        match *self {
            Move::Safe(cell) | Move::Guess(cell) => cell,
        }
    }
}

/// The knowledge-base inference engine.
///
/// The agent owns every constraint it holds. Constraints are only ever
/// mutated through the agent, and every public mutation either commits
/// completely or leaves the knowledge base untouched.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Agent {
    height: usize,
    width: usize,
    moves_made: BTreeSet<Cell>,
    known_mines: BTreeSet<Cell>,
    known_safe: BTreeSet<Cell>,
    constraints: Vec<Constraint>,
}

impl Agent {
    pub fn new(height: usize, width: usize) -> Self {
        Agent {
            height,
            width,
            moves_made: BTreeSet::new(),
            known_mines: BTreeSet::new(),
            known_safe: BTreeSet::new(),
            constraints: Vec::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn moves_made(&self) -> &BTreeSet<Cell> {
        &self.moves_made
    }

    pub fn known_mines(&self) -> &BTreeSet<Cell> {
        &self.known_mines
    }

    pub fn known_safe(&self) -> &BTreeSet<Cell> {
        &self.known_safe
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn status(&self, cell: Cell) -> CellStatus {
        if self.known_mines.contains(&cell) {
            CellStatus::Mine
        } else if self.known_safe.contains(&cell) {
            CellStatus::Safe
        } else {
            CellStatus::Unknown
        }
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        cell.row < self.height && cell.col < self.width
    }

    fn check_bounds(&self, cell: Cell) -> Result<(), InvalidObservation> {
        if self.in_bounds(cell) {
            Ok(())
        } else {
            Err(InvalidObservation::OutOfBounds {
                cell,
                height: self.height,
                width: self.width,
            })
        }
    }

    /// Called once per revealed cell with the number of mines around it.
    ///
    /// The cell is recorded as a move and marked safe, a constraint over
    /// its still-unknown neighbours is added (net of any mines already
    /// known among them), and the knowledge base is driven to a fixed
    /// point. Repeating an observation changes nothing.
    pub fn observe(&mut self, cell: Cell, count: u8) -> Result<(), InvalidObservation> {
        self.check_bounds(cell)?;

        let around: Vec<Cell> = neighbors(cell, self.height, self.width).collect();
        if count as usize > around.len() {
            return Err(InvalidObservation::CountTooLarge {
                cell,
                count,
                neighbors: around.len(),
            });
        }

        self.transact(|kb| {
            kb.moves_made.insert(cell);
            kb.apply_safe(cell)?;

            let constraint = kb.net_of_known(&Constraint::new(around, count as usize))?;
            kb.insert(constraint);
            kb.run_to_fixed_point()
        })
    }

    /// Adds an arbitrary fact to the knowledge base and runs inference.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), InvalidObservation> {
        for &cell in constraint.cells() {
            self.check_bounds(cell)?;
        }

        self.transact(|kb| {
            let constraint = kb.net_of_known(&constraint)?;
            kb.insert(constraint);
            kb.run_to_fixed_point()
        })
    }

    /// Records `cell` as a mine and removes it from every constraint.
    /// No further inference runs until [`Agent::settle`] is called.
    pub fn mark_mine(&mut self, cell: Cell) -> Result<(), InvalidObservation> {
        self.check_bounds(cell)?;
        self.transact(|kb| kb.apply_mine(cell))
    }

    /// Records `cell` as safe and removes it from every constraint.
    /// No further inference runs until [`Agent::settle`] is called.
    pub fn mark_safe(&mut self, cell: Cell) -> Result<(), InvalidObservation> {
        self.check_bounds(cell)?;
        self.transact(|kb| kb.apply_safe(cell))
    }

    /// Runs propagation and subsumption until neither produces anything new.
    pub fn settle(&mut self) -> Result<(), InvalidObservation> {
        self.transact(Agent::run_to_fixed_point)
    }

    /// Any cell known to be safe that has not been played yet.
    pub fn pick_safe_move(&self) -> Option<Cell> {
        self.known_safe.difference(&self.moves_made).next().copied()
    }

    /// A uniformly random cell that is neither played nor a known mine.
    pub fn pick_any_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Cell> {
        let candidates: Vec<Cell> = (0..self.height)
            .cartesian_product(0..self.width)
            .map(Cell::from)
            .filter(|cell| !self.moves_made.contains(cell) && !self.known_mines.contains(cell))
            .collect();

        candidates.choose(rng).copied()
    }

    /// Prefers a known-safe cell, falling back to a random guess.
    /// `None` means the board is exhausted.
    pub fn next_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Move> {
        self.pick_safe_move()
            .map(Move::Safe)
            .or_else(|| self.pick_any_move(rng).map(Move::Guess))
    }

    fn transact(
        &mut self,
        f: impl FnOnce(&mut Agent) -> Result<(), InvalidObservation>,
    ) -> Result<(), InvalidObservation> {
        let mut next = self.clone();
        f(&mut next)?;
        *self = next;
        Ok(())
    }

    fn apply_mine(&mut self, cell: Cell) -> Result<(), InvalidObservation> {
        if self.known_safe.contains(&cell) {
            return Err(InvalidObservation::Contradiction { cell });
        }
        self.known_mines.insert(cell);
        for constraint in &mut self.constraints {
            constraint.mark_mine(cell)?;
        }
        Ok(())
    }

    fn apply_safe(&mut self, cell: Cell) -> Result<(), InvalidObservation> {
        if self.known_mines.contains(&cell) {
            return Err(InvalidObservation::Contradiction { cell });
        }
        self.known_safe.insert(cell);
        for constraint in &mut self.constraints {
            constraint.mark_safe(cell)?;
        }
        Ok(())
    }

    /// Drops resolved cells from `constraint` and takes known mines off its count.
    fn net_of_known(&self, constraint: &Constraint) -> Result<Constraint, InvalidObservation> {
        let mines = constraint
            .cells()
            .iter()
            .filter(|cell| self.known_mines.contains(cell))
            .count();
        let unknown: Vec<Cell> = constraint
            .cells()
            .iter()
            .copied()
            .filter(|&cell| self.status(cell) == CellStatus::Unknown)
            .collect();

        let count = constraint.count() as isize - mines as isize;
        if count < 0 || count as usize > unknown.len() {
            return Err(InvalidObservation::Inconsistent {
                cells: unknown,
                count,
            });
        }

        Ok(Constraint::new(unknown, count as usize))
    }

    fn insert(&mut self, constraint: Constraint) {
        if constraint.is_empty() || self.constraints.contains(&constraint) {
            return;
        }
        debug!(%constraint, "new constraint");
        self.constraints.push(constraint);
    }

    fn run_to_fixed_point(&mut self) -> Result<(), InvalidObservation> {
        for round in 1usize.. {
            self.propagate()?;
            let derived = self.infer()?;
            trace!(
                round,
                constraints = self.constraints.len(),
                mines = self.known_mines.len(),
                safe = self.known_safe.len(),
                "inference round"
            );
            if !derived {
                break;
            }
        }
        Ok(())
    }

    /// Resolves every constraint that pins its cells down on its own,
    /// repeating until a sweep resolves nothing.
    fn propagate(&mut self) -> Result<(), InvalidObservation> {
        loop {
            let mines: BTreeSet<Cell> = self
                .constraints
                .iter()
                .flat_map(|c| c.resolved_mines())
                .filter(|cell| !self.known_mines.contains(cell))
                .collect();
            let safe: BTreeSet<Cell> = self
                .constraints
                .iter()
                .flat_map(|c| c.resolved_safe())
                .filter(|cell| !self.known_safe.contains(cell))
                .collect();

            for &cell in &mines {
                debug!(%cell, "deduced mine");
                self.apply_mine(cell)?;
            }
            for &cell in &safe {
                debug!(%cell, "deduced safe");
                self.apply_safe(cell)?;
            }
            self.prune();

            if mines.is_empty() && safe.is_empty() {
                return Ok(());
            }
        }
    }

    /// Removes emptied constraints and any that became duplicates.
    fn prune(&mut self) {
        let mut seen = HashSet::new();
        self.constraints
            .retain(|constraint| !constraint.is_empty() && seen.insert(constraint.clone()));
    }

    /// One subsumption pass over every pair of constraints. Returns whether
    /// a constraint not already held was derived.
    fn infer(&mut self) -> Result<bool, InvalidObservation> {
        let mut held: HashSet<Constraint> = self.constraints.iter().cloned().collect();
        let mut derived = Vec::new();

        for (a, b) in self.constraints.iter().tuple_combinations() {
            if a.cells() == b.cells() {
                if a.count() != b.count() {
                    return Err(InvalidObservation::Inconsistent {
                        cells: a.cells().iter().copied().collect(),
                        count: a.count() as isize - b.count() as isize,
                    });
                }
                continue;
            }

            for (superset, subset) in [(a, b), (b, a)] {
                if !subset.is_subset_of(superset) {
                    continue;
                }
                let constraint = superset.subtract(subset)?;
                if held.insert(constraint.clone()) {
                    debug!(%constraint, %superset, %subset, "derived constraint");
                    derived.push(constraint);
                }
            }
        }

        let learned = !derived.is_empty();
        self.constraints.extend(derived);
        Ok(learned)
    }
}
