use std::collections::BTreeSet;
use thiserror::Error;

use crate::Cell;

/// No mine layout satisfies the constraints involved.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("constraints admit no consistent mine layout")]
pub struct Inconsistency;

/// The assertion "exactly `count` of these cells are mines".
///
/// Every cell held here has unknown status; resolved cells are removed with
/// [`Constraint::mark_mine`] and [`Constraint::mark_safe`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Constraint {
    cells: BTreeSet<Cell>,
    count: usize,
}

impl Constraint {
    pub fn new(cells: BTreeSet<Cell>, count: usize) -> Self {
        assert!(
            count <= cells.len(),
            "constraint claims {} mines among {} cells",
            count,
            cells.len()
        );
        Constraint { cells, count }
    }

    pub fn cells(&self) -> &BTreeSet<Cell> {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// An empty constraint carries no information.
    pub fn is_degenerate(&self) -> bool {
        self.cells.is_empty()
    }

    /// Every cell is a mine when the count covers the whole set.
    pub fn known_mines(&self) -> BTreeSet<Cell> {
        if self.count > 0 && self.count == self.cells.len() {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Every cell is safe when the count is zero.
    pub fn known_safes(&self) -> BTreeSet<Cell> {
        if self.count == 0 {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Removes a proven mine, taking one off the count. Returns whether the
    /// constraint changed, or an error if it had no mine left to give.
    pub fn mark_mine(&mut self, cell: Cell) -> Result<bool, Inconsistency> {
        if !self.cells.contains(&cell) {
            return Ok(false);
        }
        if self.count == 0 {
            return Err(Inconsistency);
        }
        self.cells.remove(&cell);
        self.count -= 1;
        self.check_invariant();
        Ok(true)
    }

    /// Removes a proven safe cell. Returns whether the constraint changed, or
    /// an error if every remaining cell had to be a mine.
    pub fn mark_safe(&mut self, cell: Cell) -> Result<bool, Inconsistency> {
        if !self.cells.contains(&cell) {
            return Ok(false);
        }
        if self.count == self.cells.len() {
            return Err(Inconsistency);
        }
        self.cells.remove(&cell);
        self.check_invariant();
        Ok(true)
    }

    /// If `subset` covers a strict subset of these cells, the remaining cells
    /// hold exactly the difference in mines.
    pub fn subtract(&self, subset: &Constraint) -> Result<Option<Constraint>, Inconsistency> {
        if subset.cells.len() >= self.cells.len() || !subset.cells.is_subset(&self.cells) {
            return Ok(None);
        }
        let cells: BTreeSet<Cell> = self.cells.difference(&subset.cells).copied().collect();
        let count = self.count.checked_sub(subset.count).ok_or(Inconsistency)?;
        if count > cells.len() {
            return Err(Inconsistency);
        }
        Ok(Some(Constraint::new(cells, count)))
    }

    fn check_invariant(&self) {
        assert!(
            self.count <= self.cells.len(),
            "constraint invariant broken: {} mines among {:?}",
            self.count,
            self.cells
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint(cells: &[(usize, usize)], count: usize) -> Constraint {
        Constraint::new(cells.iter().copied().map(Cell::from).collect(), count)
    }

    #[test]
    fn test_full_count_means_all_mines() {
        let c = constraint(&[(0, 0), (0, 1)], 2);
        assert_eq!(c.known_mines().len(), 2);
        assert!(c.known_safes().is_empty());
    }

    #[test]
    fn test_zero_count_means_all_safe() {
        let c = constraint(&[(0, 0), (0, 1), (1, 1)], 0);
        assert_eq!(c.known_safes().len(), 3);
        assert!(c.known_mines().is_empty());
    }

    #[test]
    fn test_partial_count_proves_nothing() {
        let c = constraint(&[(0, 0), (0, 1), (1, 1)], 1);
        assert!(c.known_mines().is_empty());
        assert!(c.known_safes().is_empty());
    }

    #[test]
    fn test_mark_mine_decrements_and_is_idempotent() {
        let mut c = constraint(&[(0, 0), (0, 1)], 1);
        assert_eq!(c.mark_mine(Cell::new(0, 0)), Ok(true));
        assert_eq!(c.count(), 0);
        assert_eq!(c.mark_mine(Cell::new(0, 0)), Ok(false));
        assert_eq!(c.count(), 0);
        assert_eq!(c.known_safes(), BTreeSet::from([Cell::new(0, 1)]));
    }

    #[test]
    fn test_mark_safe_keeps_count() {
        let mut c = constraint(&[(0, 0), (0, 1), (0, 2)], 2);
        assert_eq!(c.mark_safe(Cell::new(0, 2)), Ok(true));
        assert_eq!(c.mark_safe(Cell::new(5, 5)), Ok(false));
        assert_eq!(c.count(), 2);
        assert_eq!(c.known_mines().len(), 2);
    }

    #[test]
    fn test_mark_safe_on_forced_mine_is_inconsistent() {
        let mut c = constraint(&[(0, 0), (0, 1)], 2);
        assert_eq!(c.mark_safe(Cell::new(0, 0)), Err(Inconsistency));
        // Left untouched
        assert_eq!(c, constraint(&[(0, 0), (0, 1)], 2));
    }

    #[test]
    fn test_mark_mine_on_cleared_cells_is_inconsistent() {
        let mut c = constraint(&[(0, 0), (0, 1)], 0);
        assert_eq!(c.mark_mine(Cell::new(0, 1)), Err(Inconsistency));
        assert_eq!(c, constraint(&[(0, 0), (0, 1)], 0));
    }

    #[test]
    fn test_subtract_strict_subset() {
        let outer = constraint(&[(0, 0), (0, 1), (0, 2)], 2);
        let inner = constraint(&[(0, 0), (0, 1)], 1);
        let diff = outer.subtract(&inner).unwrap().unwrap();
        assert_eq!(diff, constraint(&[(0, 2)], 1));
        assert_eq!(diff.known_mines(), BTreeSet::from([Cell::new(0, 2)]));
    }

    #[test]
    fn test_subtract_rejects_equal_and_disjoint_sets() {
        let a = constraint(&[(0, 0), (0, 1)], 1);
        let b = constraint(&[(0, 0), (0, 1)], 1);
        let c = constraint(&[(2, 2)], 0);
        assert_eq!(a.subtract(&b), Ok(None));
        assert_eq!(a.subtract(&c), Ok(None));
        assert_eq!(c.subtract(&a), Ok(None));
    }

    #[test]
    fn test_subtract_detects_conflicting_counts() {
        // The subset needs more mines than the whole set holds.
        let outer = constraint(&[(0, 0), (0, 1), (0, 2)], 1);
        let inner = constraint(&[(0, 0), (0, 1)], 2);
        assert_eq!(outer.subtract(&inner), Err(Inconsistency));

        // The remainder would need more mines than it has cells.
        let outer = constraint(&[(0, 0), (0, 1), (0, 2)], 3);
        let inner = constraint(&[(0, 0), (0, 1)], 1);
        assert_eq!(outer.subtract(&inner), Err(Inconsistency));
    }

    #[test]
    fn test_empty_constraint_is_degenerate() {
        assert!(constraint(&[], 0).is_degenerate());
        assert!(!constraint(&[(1, 1)], 0).is_degenerate());
    }
}
