use rand::Rng;
use rand::prelude::IndexedRandom;

use crate::{Cell, KnowledgeBase};

/// The next cell to probe and how it was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Proven safe by the knowledge base.
    Safe(Cell),
    /// A uniform guess among cells not known to be mines.
    Guess(Cell),
}

impl Move {
    pub fn cell(self) -> Cell {
        match self {
            Move::Safe(cell) | Move::Guess(cell) => cell,
        }
    }
}

impl KnowledgeBase {
    /// A proven-safe cell that has not been probed yet, if any.
    pub fn safe_move(&self) -> Option<Cell> {
        self.safes().difference(self.moves_made()).next().copied()
    }

    /// Fallback when nothing is provably safe: a uniform choice among cells
    /// that are neither probed nor proven mines.
    pub fn random_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Cell> {
        let candidates: Vec<Cell> = (0..self.height())
            .flat_map(|row| (0..self.width()).map(move |col| Cell::new(row, col)))
            .filter(|cell| !self.moves_made().contains(cell) && !self.mines().contains(cell))
            .collect();

        candidates.choose(rng).copied()
    }

    /// Prefers a safe move and guesses otherwise. `None` once every cell
    /// is either probed or a proven mine.
    pub fn next_move<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Move> {
        self.safe_move()
            .map(Move::Safe)
            .or_else(|| self.random_move(rng).map(Move::Guess))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_fresh_knowledge_has_no_safe_move() {
        let kb = KnowledgeBase::new(3, 3);
        assert_eq!(kb.safe_move(), None);
    }

    #[test]
    fn test_safe_move_skips_probed_cells() {
        let mut kb = KnowledgeBase::new(3, 3);
        kb.observe(Cell::new(0, 0), 0).unwrap();
        let cell = kb.safe_move().unwrap();
        assert!(kb.safes().contains(&cell));
        assert_ne!(cell, Cell::new(0, 0));
    }

    #[test]
    fn test_random_move_avoids_mines_and_probed_cells() {
        let mut kb = KnowledgeBase::new(3, 3);
        for (cell, count) in [((0, 0), 2), ((0, 1), 2)] {
            kb.observe(cell.into(), count).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let cell = kb.random_move(&mut rng).unwrap();
            assert!(!kb.mines().contains(&cell));
            assert!(!kb.moves_made().contains(&cell));
        }
    }

    #[test]
    fn test_next_move_prefers_safe_cells() {
        let mut kb = KnowledgeBase::new(3, 3);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(kb.next_move(&mut rng), Some(Move::Guess(_))));

        kb.observe(Cell::new(1, 1), 0).unwrap();
        assert!(matches!(kb.next_move(&mut rng), Some(Move::Safe(_))));
    }

    #[test]
    fn test_no_move_when_board_is_exhausted() {
        let mut kb = KnowledgeBase::new(1, 2);
        kb.observe(Cell::new(0, 0), 1).unwrap();
        assert_eq!(kb.mines().len(), 1);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(kb.next_move(&mut rng), None);
    }
}
