use itertools::Itertools;
use std::collections::{BTreeSet, HashMap};

use crate::{Cell, Constraint, Inconsistency, InvalidObservation};

/// The largest clue a revealed cell can carry.
pub const MAX_CLUE: u8 = 8;

/// Everything the player has learned about one board.
///
/// Facts only accumulate: a cell, once proven a mine or safe, stays that way
/// for the lifetime of the game.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KnowledgeBase {
    height: usize,
    width: usize,
    /// Cells already probed.
    moves_made: BTreeSet<Cell>,
    /// Cells proven to be mines.
    mines: BTreeSet<Cell>,
    /// Cells proven safe, including every probed cell.
    safes: BTreeSet<Cell>,
    /// Open constraints over cells of unknown status, unique by cell set.
    constraints: Vec<Constraint>,
}

impl KnowledgeBase {
    pub fn new(height: usize, width: usize) -> Self {
        KnowledgeBase {
            height,
            width,
            moves_made: BTreeSet::new(),
            mines: BTreeSet::new(),
            safes: BTreeSet::new(),
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

    pub fn mines(&self) -> &BTreeSet<Cell> {
        &self.mines
    }

    pub fn safes(&self) -> &BTreeSet<Cell> {
        &self.safes
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Records that `cell` was revealed with `count` adjacent mines and runs
    /// inference until nothing new can be proven.
    ///
    /// Inference runs on a copy that replaces this one only on success, so on
    /// error the knowledge base is untouched.
    pub fn observe(&mut self, cell: Cell, count: u8) -> Result<(), InvalidObservation> {
        let constraint = self.constraint_for(cell, count)?;

        let mut staged = self.clone();
        staged
            .record(cell, constraint)
            .map_err(|_| InvalidObservation::Contradiction {
                cell,
                count,
                reason: "clue conflicts with open constraints",
            })?;
        *self = staged;

        Ok(())
    }

    fn record(&mut self, cell: Cell, constraint: Constraint) -> Result<(), Inconsistency> {
        self.moves_made.insert(cell);
        self.mark_safe(cell)?;
        self.insert_constraint(constraint)?;
        self.infer()
    }

    /// Validates an observation and builds its constraint over the neighbours
    /// whose status is still unknown.
    fn constraint_for(&self, cell: Cell, count: u8) -> Result<Constraint, InvalidObservation> {
        if !cell.in_bounds(self.height, self.width) {
            return Err(InvalidObservation::OutOfBounds {
                cell,
                height: self.height,
                width: self.width,
            });
        }
        if count > MAX_CLUE {
            return Err(InvalidObservation::CountOutOfRange { cell, count });
        }
        if self.moves_made.contains(&cell) {
            return Err(InvalidObservation::AlreadyObserved { cell });
        }
        if self.mines.contains(&cell) {
            return Err(InvalidObservation::Contradiction {
                cell,
                count,
                reason: "cell is a proven mine",
            });
        }

        let mut unknown = BTreeSet::new();
        let mut known_mines = 0;
        for neighbor in cell.neighbors(self.height, self.width) {
            if self.mines.contains(&neighbor) {
                known_mines += 1;
            } else if !self.safes.contains(&neighbor) {
                unknown.insert(neighbor);
            }
        }

        let remaining = (count as usize).checked_sub(known_mines).ok_or(
            InvalidObservation::Contradiction {
                cell,
                count,
                reason: "fewer mines than proven neighbouring mines",
            },
        )?;
        if remaining > unknown.len() {
            return Err(InvalidObservation::Contradiction {
                cell,
                count,
                reason: "more mines than unresolved neighbours",
            });
        }

        Ok(Constraint::new(unknown, remaining))
    }

    /// Repeats full passes of the base rules and the subset rule until a pass
    /// proves no new cell and derives no new constraint.
    fn infer(&mut self) -> Result<(), Inconsistency> {
        loop {
            let mut changed = false;

            let mut new_mines = BTreeSet::new();
            let mut new_safes = BTreeSet::new();
            for constraint in &self.constraints {
                new_mines.extend(constraint.known_mines());
                new_safes.extend(constraint.known_safes());
            }
            for cell in new_mines {
                changed |= self.mark_mine(cell)?;
            }
            for cell in new_safes {
                changed |= self.mark_safe(cell)?;
            }

            self.prune()?;

            let mut derived = Vec::new();
            for (a, b) in self.constraints.iter().tuple_combinations() {
                if let Some(constraint) = a.subtract(b)? {
                    derived.push(constraint);
                } else if let Some(constraint) = b.subtract(a)? {
                    derived.push(constraint);
                }
            }
            for constraint in derived {
                changed |= self.insert_constraint(constraint)?;
            }

            if !changed {
                return Ok(());
            }
        }
    }

    fn mark_mine(&mut self, cell: Cell) -> Result<bool, Inconsistency> {
        if self.safes.contains(&cell) {
            return Err(Inconsistency);
        }
        if !self.mines.insert(cell) {
            return Ok(false);
        }
        for constraint in &mut self.constraints {
            constraint.mark_mine(cell)?;
        }
        Ok(true)
    }

    fn mark_safe(&mut self, cell: Cell) -> Result<bool, Inconsistency> {
        if self.mines.contains(&cell) {
            return Err(Inconsistency);
        }
        if !self.safes.insert(cell) {
            return Ok(false);
        }
        for constraint in &mut self.constraints {
            constraint.mark_safe(cell)?;
        }
        Ok(true)
    }

    /// Adds a constraint unless it is empty or its cell set is already held.
    /// The same cells under a different count cannot both hold.
    fn insert_constraint(&mut self, constraint: Constraint) -> Result<bool, Inconsistency> {
        if constraint.is_degenerate() {
            return Ok(false);
        }
        if let Some(existing) = self
            .constraints
            .iter()
            .find(|existing| existing.cells() == constraint.cells())
        {
            if existing.count() != constraint.count() {
                return Err(Inconsistency);
            }
            return Ok(false);
        }
        self.constraints.push(constraint);
        Ok(true)
    }

    /// Drops emptied constraints and those that collapsed onto an existing
    /// cell set after resolution.
    fn prune(&mut self) -> Result<(), Inconsistency> {
        let mut seen: HashMap<BTreeSet<Cell>, usize> = HashMap::new();
        let mut kept = Vec::with_capacity(self.constraints.len());
        for constraint in std::mem::take(&mut self.constraints) {
            if constraint.is_degenerate() {
                continue;
            }
            match seen.get(constraint.cells()) {
                Some(&count) if count != constraint.count() => return Err(Inconsistency),
                Some(_) => {}
                None => {
                    seen.insert(constraint.cells().clone(), constraint.count());
                    kept.push(constraint);
                }
            }
        }
        self.constraints = kept;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn cells(list: &[(usize, usize)]) -> BTreeSet<Cell> {
        list.iter().copied().map(Cell::from).collect()
    }

    fn observe_all(kb: &mut KnowledgeBase, observations: &[((usize, usize), u8)]) {
        for &(cell, count) in observations {
            kb.observe(cell.into(), count).unwrap();
        }
    }

    fn assert_settled(kb: &KnowledgeBase) {
        assert!(kb.mines().is_disjoint(kb.safes()));
        assert!(kb.moves_made().is_subset(kb.safes()));
        for constraint in kb.constraints() {
            assert!(!constraint.is_degenerate());
            assert!(constraint.count() <= constraint.cells().len());
            assert!(constraint.cells().is_disjoint(kb.mines()));
            assert!(constraint.cells().is_disjoint(kb.safes()));
        }
    }

    #[test]
    fn test_infer_single_mine() {
        let mut kb = KnowledgeBase::new(3, 3);
        observe_all(&mut kb, &[((1, 1), 1), ((1, 2), 1), ((2, 1), 1)]);
        assert_eq!(kb.mines(), &cells(&[(2, 2)]));
        assert_settled(&kb);
    }

    #[test]
    fn test_infer_multiple_mines() {
        let mut kb = KnowledgeBase::new(3, 3);
        observe_all(&mut kb, &[((0, 0), 2), ((0, 1), 2)]);
        assert_eq!(kb.mines(), &cells(&[(1, 0), (1, 1)]));
        assert!(kb.safes().contains(&Cell::new(0, 2)));
        assert!(kb.safes().contains(&Cell::new(1, 2)));
        assert_settled(&kb);
    }

    #[test]
    fn test_infer_safe_cells_by_subset() {
        let mut kb = KnowledgeBase::new(3, 3);
        observe_all(&mut kb, &[((1, 1), 1), ((1, 2), 1)]);
        assert!(kb.safes().contains(&Cell::new(0, 0)));
        assert!(kb.safes().contains(&Cell::new(1, 0)));
        assert!(kb.safes().contains(&Cell::new(2, 0)));
        assert!(kb.mines().is_empty());
        assert_settled(&kb);
    }

    #[test]
    fn test_zero_clue_clears_neighbourhood() {
        let mut kb = KnowledgeBase::new(4, 4);
        kb.observe(Cell::new(0, 0), 0).unwrap();
        assert_eq!(kb.safes(), &cells(&[(0, 0), (0, 1), (1, 0), (1, 1)]));
        assert!(kb.constraints().is_empty());
    }

    #[test]
    fn test_known_mines_are_subtracted_from_new_clues() {
        let mut kb = KnowledgeBase::new(3, 3);
        observe_all(&mut kb, &[((0, 0), 2), ((0, 1), 2)]);
        // Both neighbouring mines are known, so a 2 here clears the rest.
        kb.observe(Cell::new(2, 0), 2).unwrap();
        assert!(kb.safes().contains(&Cell::new(2, 1)));
        assert_settled(&kb);
    }

    #[test]
    fn test_order_independence() {
        let observations = [((1, 1), 1), ((1, 2), 1), ((2, 1), 1)];
        let mut reference = KnowledgeBase::new(3, 3);
        observe_all(&mut reference, &observations);

        for order in observations.iter().copied().permutations(observations.len()) {
            let mut kb = KnowledgeBase::new(3, 3);
            observe_all(&mut kb, &order);
            assert_eq!(kb.mines(), reference.mines(), "order {order:?}");
            assert_eq!(kb.safes(), reference.safes(), "order {order:?}");
        }
    }

    #[test]
    fn test_facts_only_grow() {
        let mut kb = KnowledgeBase::new(3, 3);
        let mut mines = BTreeSet::new();
        let mut safes = BTreeSet::new();
        for &(cell, count) in &[((1, 1), 1), ((1, 2), 1), ((2, 1), 1), ((0, 0), 0)] {
            kb.observe(cell.into(), count).unwrap();
            assert!(mines.is_subset(kb.mines()));
            assert!(safes.is_subset(kb.safes()));
            assert_settled(&kb);
            mines = kb.mines().clone();
            safes = kb.safes().clone();
        }
    }

    #[test]
    fn test_rejects_malformed_observations() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.observe(Cell::new(1, 1), 1).unwrap();
        let before = kb.clone();

        assert!(matches!(
            kb.observe(Cell::new(3, 0), 0),
            Err(InvalidObservation::OutOfBounds { .. })
        ));
        assert!(matches!(
            kb.observe(Cell::new(0, 0), 9),
            Err(InvalidObservation::CountOutOfRange { count: 9, .. })
        ));
        assert!(matches!(
            kb.observe(Cell::new(1, 1), 1),
            Err(InvalidObservation::AlreadyObserved { .. })
        ));
        assert_eq!(kb, before);
    }

    #[test]
    fn test_rejects_contradicting_observations() {
        let mut kb = KnowledgeBase::new(3, 3);
        observe_all(&mut kb, &[((0, 0), 2), ((0, 1), 2)]);
        let before = kb.clone();

        // (1, 0) is a proven mine.
        assert!(matches!(
            kb.observe(Cell::new(1, 0), 1),
            Err(InvalidObservation::Contradiction { .. })
        ));
        // (2, 0) borders both proven mines.
        assert!(matches!(
            kb.observe(Cell::new(2, 0), 1),
            Err(InvalidObservation::Contradiction { .. })
        ));
        // A corner has only three neighbours.
        assert!(matches!(
            kb.observe(Cell::new(0, 2), 4),
            Err(InvalidObservation::Contradiction { .. })
        ));
        assert_eq!(kb, before);
    }

    #[test]
    fn test_clue_conflicting_with_open_constraint_is_rejected() {
        // (0, 0) = 1 puts one mine among (0, 1), (1, 0), (1, 1). Revealing
        // (0, 1) as 0 clears all of them, which leaves no room for that mine.
        let mut kb = KnowledgeBase::new(2, 3);
        kb.observe(Cell::new(0, 0), 1).unwrap();
        let before = kb.clone();

        assert!(matches!(
            kb.observe(Cell::new(0, 1), 0),
            Err(InvalidObservation::Contradiction { .. })
        ));
        assert_eq!(kb, before);
        assert!(!kb.moves_made().contains(&Cell::new(0, 1)));

        // The rejected clue leaves the base usable.
        kb.observe(Cell::new(0, 1), 1).unwrap();
        assert_settled(&kb);
    }

    #[test]
    fn test_constraints_are_unique_by_cell_set() {
        let mut kb = KnowledgeBase::new(3, 3);
        observe_all(&mut kb, &[((1, 1), 1), ((1, 2), 1)]);
        let sets: HashSet<_> = kb.constraints().iter().map(|c| c.cells().clone()).collect();
        assert_eq!(sets.len(), kb.constraints().len());
        assert_settled(&kb);
    }
}
