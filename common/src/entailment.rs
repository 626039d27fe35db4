//! An independent decision procedure for what a set of constraints entails.
//!
//! The agent's subsumption rule is cheap but incomplete. This module encodes
//! the same facts as CNF and asks a SAT solver, cell by cell, whether a mine
//! (or a safe cell) is still possible. Anything the agent claims to know must
//! be forced here as well.

use crate::{Agent, Cell, Constraint, neighbors};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use varisat::{CnfFormula, ExtendFormula, Lit, Solver, Var};

/// The possible outcomes of the solver's analysis for a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeducedState {
    ForcedMine,   // Every model makes this cell a mine.
    ForcedSafe,   // Every model makes this cell safe.
    Undetermined, // Models exist either way.
}

/// A revealed cell together with the number of mines around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Observation {
    pub cell: Cell,
    pub count: u8,
}

/// The raw facts implied by a sequence of observations: every revealed cell
/// is safe, and its full neighbourhood holds exactly `count` mines.
pub fn observation_constraints(
    height: usize,
    width: usize,
    observations: &[Observation],
) -> Vec<Constraint> {
    observations
        .iter()
        .flat_map(|obs| {
            [
                Constraint::new([obs.cell], 0),
                Constraint::new(neighbors(obs.cell, height, width), obs.count as usize),
            ]
        })
        .filter(|constraint| !constraint.is_empty())
        .collect()
}

/// Decides every cell mentioned by `constraints`.
///
/// Fails when the constraints admit no assignment at all.
pub fn analyze(constraints: &[Constraint]) -> anyhow::Result<BTreeMap<Cell, DeducedState>> {
    let mut solver = Solver::new();
    let mut var_map: HashMap<Cell, Var> = HashMap::new();

    // 1. One SAT variable per cell, true meaning "mine"
    let cells: BTreeSet<Cell> = constraints
        .iter()
        .flat_map(|constraint| constraint.cells().iter().copied())
        .collect();
    for &cell in &cells {
        var_map.insert(cell, solver.new_var());
    }

    // 2. Encode all constraints as CNF
    let mut formula = CnfFormula::new();
    for constraint in constraints {
        let lits: Vec<Lit> = constraint
            .cells()
            .iter()
            .map(|cell| Lit::from_var(var_map[cell], true))
            .collect();
        encode_exactly_k(&mut formula, &mut solver, &lits, constraint.count());
    }
    solver.add_formula(&formula);

    if !solver.solve()? {
        anyhow::bail!("solve_fail");
    }

    // 3. Test both polarities of every variable under assumptions
    let mut deductions = BTreeMap::new();
    for &cell in &cells {
        let var = var_map[&cell];
        let mine_possible = solve_assuming(&mut solver, Lit::from_var(var, true))?;
        let safe_possible = solve_assuming(&mut solver, Lit::from_var(var, false))?;

        let state = match (mine_possible, safe_possible) {
            (true, true) => DeducedState::Undetermined,
            (true, false) => DeducedState::ForcedMine,
            (false, true) => DeducedState::ForcedSafe,
            (false, false) => anyhow::bail!("state_collision"),
        };
        deductions.insert(cell, state);
    }

    Ok(deductions)
}

/// Checks that everything `agent` believes follows from `observations`.
pub fn audit(agent: &Agent, observations: &[Observation]) -> anyhow::Result<()> {
    let constraints = observation_constraints(agent.height(), agent.width(), observations);
    let deductions = analyze(&constraints)?;

    let claims = agent
        .known_mines()
        .iter()
        .map(|&cell| (cell, DeducedState::ForcedMine))
        .chain(
            agent
                .known_safe()
                .iter()
                .map(|&cell| (cell, DeducedState::ForcedSafe)),
        );

    for (cell, claimed) in claims {
        match deductions.get(&cell) {
            Some(&state) if state == claimed => {}
            Some(&state) => {
                anyhow::bail!("agent claims {cell} is {claimed:?} but the observations give {state:?}")
            }
            None => anyhow::bail!("agent claims {cell} is {claimed:?} without any observation of it"),
        }
    }

    Ok(())
}

fn solve_assuming(solver: &mut Solver, lit: Lit) -> anyhow::Result<bool> {
    solver.assume(&[lit]);
    let result = solver.solve();
    solver.assume(&[]);
    Ok(result?)
}

/// Encodes an "exactly k" constraint into the CNF formula.
fn encode_exactly_k(formula: &mut CnfFormula, solver: &mut Solver, vars: &[Lit], k: usize) {
    encode_at_most_k(formula, solver, vars, k);
    encode_at_least_k(formula, solver, vars, k);
}

/// Encodes an "at most k" constraint into the CNF formula.
fn encode_at_most_k(formula: &mut CnfFormula, solver: &mut Solver, vars: &[Lit], k: usize) {
    if k >= vars.len() {
        return;
    }
    if k == 0 {
        for &lit in vars {
            formula.add_clause(&[!lit]);
        }
        return;
    }

    if vars.len() <= 10 {
        // Neighbourhood-sized: forbid every (k+1)-subset directly.
        for combo in vars.iter().copied().combinations(k + 1) {
            let clause: Vec<Lit> = combo.iter().map(|&lit| !lit).collect();
            formula.add_clause(&clause);
        }
    } else {
        encode_sequential_counter(formula, solver, vars, k);
    }
}

/// Encodes an "at least k" constraint into the CNF formula.
fn encode_at_least_k(formula: &mut CnfFormula, solver: &mut Solver, vars: &[Lit], k: usize) {
    if k == 0 {
        return;
    }
    if k > vars.len() {
        formula.add_clause(&[]);
        return;
    }

    // At least k of the literals is at most n - k of their negations.
    let negated: Vec<Lit> = vars.iter().map(|&lit| !lit).collect();
    encode_at_most_k(formula, solver, &negated, vars.len() - k);
}

/// Sequential counter for "at most k" with `0 < k < n`.
///
/// `s[i][j]` holds when at least `j + 1` of `vars[..=i]` are true.
fn encode_sequential_counter(formula: &mut CnfFormula, solver: &mut Solver, vars: &[Lit], k: usize) {
    let n = vars.len();
    let s: Vec<Vec<Lit>> = (0..n - 1)
        .map(|_| (0..k).map(|_| Lit::from_var(solver.new_var(), true)).collect())
        .collect();

    formula.add_clause(&[!vars[0], s[0][0]]);
    for j in 1..k {
        formula.add_clause(&[!s[0][j]]);
    }

    for i in 1..n - 1 {
        formula.add_clause(&[!vars[i], s[i][0]]);
        formula.add_clause(&[!s[i - 1][0], s[i][0]]);
        for j in 1..k {
            formula.add_clause(&[!vars[i], !s[i - 1][j - 1], s[i][j]]);
            formula.add_clause(&[!s[i - 1][j], s[i][j]]);
        }
        formula.add_clause(&[!vars[i], !s[i - 1][k - 1]]);
    }

    formula.add_clause(&[!vars[n - 1], !s[n - 2][k - 1]]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(row: usize, col: usize) -> Cell {
        Cell::new(row, col)
    }

    #[test]
    fn test_simple_analysis() {
        // Exactly one mine between two cells: neither is decided
        let constraints = vec![Constraint::new([c(0, 0), c(0, 1)], 1)];
        let deductions = analyze(&constraints).unwrap();

        assert_eq!(deductions.get(&c(0, 0)), Some(&DeducedState::Undetermined));
        assert_eq!(deductions.get(&c(0, 1)), Some(&DeducedState::Undetermined));
    }

    #[test]
    fn test_subset_analysis() {
        let constraints = vec![
            Constraint::new([c(0, 0), c(0, 1), c(0, 2)], 1),
            Constraint::new([c(0, 0), c(0, 1)], 1),
        ];
        let deductions = analyze(&constraints).unwrap();

        assert_eq!(deductions[&c(0, 2)], DeducedState::ForcedSafe);
        assert_eq!(deductions[&c(0, 0)], DeducedState::Undetermined);
    }

    #[test]
    fn test_unsatisfiable_constraints() {
        let constraints = vec![
            Constraint::new([c(0, 0), c(0, 1)], 2),
            Constraint::new([c(0, 0)], 0),
        ];
        assert!(analyze(&constraints).is_err());
    }

    #[test]
    fn test_large_constraint_uses_counter_encoding() {
        // 12 cells, 3 mines, of which 9 are pinned safe: the rest are mines
        let row: Vec<Cell> = (0..12).map(|col| c(0, col)).collect();
        let mut constraints = vec![Constraint::new(row.iter().copied(), 3)];
        constraints.push(Constraint::new(row[..9].iter().copied(), 0));

        let deductions = analyze(&constraints).unwrap();
        for cell in &row[..9] {
            assert_eq!(deductions[cell], DeducedState::ForcedSafe);
        }
        for cell in &row[9..] {
            assert_eq!(deductions[cell], DeducedState::ForcedMine);
        }
    }

    #[test]
    fn test_large_constraint_leaves_freedom() {
        let row: Vec<Cell> = (0..12).map(|col| c(0, col)).collect();
        let constraints = vec![Constraint::new(row.iter().copied(), 4)];

        let deductions = analyze(&constraints).unwrap();
        assert!(
            deductions
                .values()
                .all(|&state| state == DeducedState::Undetermined)
        );
    }

    #[test]
    fn test_observation_constraints() {
        let observations = [Observation {
            cell: c(0, 0),
            count: 1,
        }];
        let constraints = observation_constraints(2, 2, &observations);

        assert_eq!(
            constraints,
            vec![
                Constraint::new([c(0, 0)], 0),
                Constraint::new([c(0, 1), c(1, 0), c(1, 1)], 1),
            ]
        );
    }

    #[test]
    fn test_audit_accepts_agent_deductions() {
        let mut agent = Agent::new(1, 3);
        let observations = [
            Observation {
                cell: c(0, 2),
                count: 0,
            },
            Observation {
                cell: c(0, 1),
                count: 1,
            },
        ];
        for obs in &observations {
            agent.observe(obs.cell, obs.count).unwrap();
        }

        audit(&agent, &observations).unwrap();
    }

    #[test]
    fn test_audit_rejects_unsupported_claims() {
        let mut agent = Agent::new(1, 3);
        agent.observe(c(0, 1), 1).unwrap();
        agent.mark_mine(c(0, 0)).unwrap();

        let observations = [Observation {
            cell: c(0, 1),
            count: 1,
        }];
        assert!(audit(&agent, &observations).is_err());
    }
}
