//! Complete entailment check for revealed clues, backed by a SAT solver.
//!
//! The knowledge base is sound but incomplete. This module answers, for every
//! unprobed cell next to a clue, whether *all* mine layouts consistent with
//! the clues agree on it. Used to audit the knowledge base's conclusions.

use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use varisat::{CnfFormula, ExtendFormula, Lit, Solver, Var};

use crate::{Cell, KnowledgeBase};

/// The possible outcomes of the solver's analysis for a single hidden cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeducedState {
    ForcedMine,   // Every consistent layout puts a mine here.
    ForcedSafe,   // No consistent layout puts a mine here.
    Undetermined, // Both are possible.
}

pub type Deductions = HashMap<Cell, DeducedState>;

/// Classifies every unprobed neighbour of the given clues.
///
/// Each clue contributes an "exactly k" cardinality constraint over its
/// unprobed neighbours. Probed cells are safe by definition and carry no
/// variable. Fails when no mine layout satisfies all the clues.
pub fn deduce(height: usize, width: usize, clues: &[(Cell, u8)]) -> anyhow::Result<Deductions> {
    let probed: HashSet<Cell> = clues.iter().map(|&(cell, _)| cell).collect();

    let mut solver = Solver::new();
    let mut var_map: HashMap<Cell, Var> = HashMap::new();
    let mut formula = CnfFormula::new();

    for &(cell, count) in clues {
        let mut lits = Vec::new();
        for neighbor in cell.neighbors(height, width) {
            if probed.contains(&neighbor) {
                continue;
            }
            let var = *var_map.entry(neighbor).or_insert_with(|| solver.new_var());
            lits.push(Lit::from_var(var, true));
        }
        encode_exactly_k(&mut formula, &lits, count as usize);
    }

    solver.add_formula(&formula);

    if !solver.solve()? {
        anyhow::bail!("clues admit no mine layout");
    }

    let mut deductions = Deductions::new();
    for (&cell, &var) in &var_map {
        let mine_possible = satisfiable_with(&mut solver, Lit::from_var(var, true))?;
        let safe_possible = satisfiable_with(&mut solver, Lit::from_var(var, false))?;

        let state = match (mine_possible, safe_possible) {
            (true, true) => DeducedState::Undetermined,
            (true, false) => DeducedState::ForcedMine,
            (false, true) => DeducedState::ForcedSafe,
            (false, false) => anyhow::bail!("state_collision at {cell}"),
        };
        deductions.insert(cell, state);
    }

    Ok(deductions)
}

/// Checks every fact the knowledge base holds against the solver.
///
/// Probed cells are skipped; every other proven mine must be a forced mine
/// and every other proven safe cell a forced safe one.
pub fn verify(kb: &KnowledgeBase, clues: &[(Cell, u8)]) -> anyhow::Result<()> {
    let deductions = deduce(kb.height(), kb.width(), clues)?;

    for &cell in kb.mines() {
        let state = deductions.get(&cell).copied();
        if state != Some(DeducedState::ForcedMine) {
            anyhow::bail!("{cell} marked as a mine but the solver says {state:?}");
        }
    }
    for cell in kb.safes().difference(kb.moves_made()) {
        let state = deductions.get(cell).copied();
        if state != Some(DeducedState::ForcedSafe) {
            anyhow::bail!("{cell} marked safe but the solver says {state:?}");
        }
    }

    Ok(())
}

fn satisfiable_with(solver: &mut Solver, lit: Lit) -> anyhow::Result<bool> {
    solver.assume(&[lit]);
    let result = solver.solve();
    solver.assume(&[]);
    Ok(result?)
}

/// Encodes "exactly k of these literals are true".
///
/// Clue neighbourhoods hold at most eight cells, so the naive encoding over
/// combinations stays small.
fn encode_exactly_k(formula: &mut CnfFormula, lits: &[Lit], k: usize) {
    encode_at_most_k(formula, lits, k);
    encode_at_least_k(formula, lits, k);
}

fn encode_at_most_k(formula: &mut CnfFormula, lits: &[Lit], k: usize) {
    if k >= lits.len() {
        return;
    }
    // No k + 1 of them may be true together.
    for combo in lits.iter().copied().combinations(k + 1) {
        let clause: Vec<Lit> = combo.iter().map(|&lit| !lit).collect();
        formula.add_clause(&clause);
    }
}

fn encode_at_least_k(formula: &mut CnfFormula, lits: &[Lit], k: usize) {
    if k == 0 {
        return;
    }
    if k > lits.len() {
        formula.add_clause(&[]);
        return;
    }
    // Any n - k + 1 of them must include a true one.
    for combo in lits.iter().copied().combinations(lits.len() - k + 1) {
        formula.add_clause(&combo);
    }
}
