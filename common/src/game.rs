use rand::prelude::IndexedRandom;
use rand::{SeedableRng, rngs::StdRng};
use std::collections::{HashSet, VecDeque};

use crate::Cell;

/// The visible state of a single tile on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Tile {
    Hidden,
    Revealed(u8), // The u8 is the number of adjacent mines.
}

/// Represents the current state of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

/// What a single click uncovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reveal {
    Exploded,
    /// Every newly revealed tile with its clue. Empty when the tile was
    /// already open.
    Opened(Vec<(Cell, u8)>),
}

/// A minesweeper board with a hidden mine layout and the tiles shown so far.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Game {
    pub width: usize,
    pub height: usize,
    /// The visible board, indexed `[row][col]`.
    pub board: Vec<Vec<Tile>>,
    pub total_mines: usize,
    pub game_state: GameState,
    /// Laid on the first reveal so the opening click is never a mine.
    mines: Option<Vec<Vec<bool>>>,
    seed: u64,
}

impl Game {
    pub fn new(width: usize, height: usize, total_mines: usize, seed: u64) -> anyhow::Result<Self> {
        if width == 0 || height == 0 {
            anyhow::bail!("board must have at least one row and one column");
        }
        if total_mines >= width * height {
            anyhow::bail!("Total mines must be less than the number of cells on the board.");
        }
        Ok(Game {
            width,
            height,
            board: vec![vec![Tile::Hidden; width]; height],
            total_mines,
            game_state: GameState::Playing,
            mines: None,
            seed,
        })
    }

    /// A board with a fixed mine layout, skipping the random placement.
    pub fn with_mines(width: usize, height: usize, mines: &[Cell]) -> anyhow::Result<Self> {
        let mut game = Game::new(width, height, 0, 0)?;
        let mut layout = vec![vec![false; width]; height];
        for &cell in mines {
            if !cell.in_bounds(height, width) {
                anyhow::bail!("mine {cell} is off the board");
            }
            layout[cell.row][cell.col] = true;
        }
        game.total_mines = layout.iter().flatten().filter(|&&m| m).count();
        game.mines = Some(layout);
        Ok(game)
    }

    /// Checks that the visible board and the mine layout both match the
    /// declared dimensions. Decoded games must pass this before use.
    pub fn check_shape(&self) -> anyhow::Result<()> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!("board must have at least one row and one column");
        }
        if !has_shape(&self.board, self.height, self.width) {
            anyhow::bail!("visible board does not match {}x{}", self.height, self.width);
        }
        if let Some(layout) = &self.mines {
            if !has_shape(layout, self.height, self.width) {
                anyhow::bail!("mine layout does not match {}x{}", self.height, self.width);
            }
        }
        Ok(())
    }

    /// Opens a tile, cascading through zero clues.
    pub fn reveal_cell(&mut self, at: Cell) -> anyhow::Result<Reveal> {
        if !at.in_bounds(self.height, self.width) {
            anyhow::bail!("cell {at} is off the board");
        }
        if self.game_state != GameState::Playing {
            anyhow::bail!("game_ended");
        }
        if !matches!(self.board[at.row][at.col], Tile::Hidden) {
            return Ok(Reveal::Opened(Vec::new()));
        }

        if self.mines.is_none() {
            self.lay_mines(at);
        }

        if self.is_mine(at) {
            self.game_state = GameState::Lost;
            return Ok(Reveal::Exploded);
        }

        let revealed = self.flood_fill_reveal(at);

        if self.check_win_condition() {
            self.game_state = GameState::Won;
        }

        Ok(Reveal::Opened(revealed))
    }

    pub fn is_mine(&self, cell: Cell) -> bool {
        self.mines
            .as_ref()
            .is_some_and(|layout| layout[cell.row][cell.col])
    }

    /// The game is won once every tile without a mine is open.
    pub fn check_win_condition(&self) -> bool {
        self.mines.is_some()
            && self.cells().all(|cell| {
                self.is_mine(cell) || matches!(self.board[cell.row][cell.col], Tile::Revealed(_))
            })
    }

    /// Every open tile with its clue.
    pub fn clues(&self) -> Vec<(Cell, u8)> {
        self.cells()
            .filter_map(|cell| match self.board[cell.row][cell.col] {
                Tile::Revealed(count) => Some((cell, count)),
                Tile::Hidden => None,
            })
            .collect()
    }

    fn cells(&self) -> impl Iterator<Item = Cell> {
        let width = self.width;
        (0..self.height).flat_map(move |row| (0..width).map(move |col| Cell::new(row, col)))
    }

    /// Places the mines away from the first click and, room permitting, away
    /// from its neighbours too.
    fn lay_mines(&mut self, first_click: Cell) {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let opening: HashSet<Cell> = first_click
            .neighbors(self.height, self.width)
            .chain(std::iter::once(first_click))
            .collect();
        let mut candidates: Vec<Cell> = self.cells().filter(|c| !opening.contains(c)).collect();
        if candidates.len() < self.total_mines {
            candidates = self.cells().filter(|&c| c != first_click).collect();
        }

        let mut layout = vec![vec![false; self.width]; self.height];
        for cell in candidates.choose_multiple(&mut rng, self.total_mines) {
            layout[cell.row][cell.col] = true;
        }
        self.mines = Some(layout);
    }

    fn count_adjacent_mines(&self, cell: Cell) -> u8 {
        cell.neighbors(self.height, self.width)
            .filter(|&n| self.is_mine(n))
            .count() as u8
    }

    /// Reveals `start` and, through zero clues, every tile reachable from it.
    fn flood_fill_reveal(&mut self, start: Cell) -> Vec<(Cell, u8)> {
        let mut revealed = Vec::new();
        let mut queue = VecDeque::from([start]);
        let mut visited = HashSet::from([start]);

        while let Some(cell) = queue.pop_front() {
            if !matches!(self.board[cell.row][cell.col], Tile::Hidden) {
                continue;
            }

            let count = self.count_adjacent_mines(cell);
            self.board[cell.row][cell.col] = Tile::Revealed(count);
            revealed.push((cell, count));

            if count == 0 {
                for neighbor in cell.neighbors(self.height, self.width) {
                    if matches!(self.board[neighbor.row][neighbor.col], Tile::Hidden)
                        && visited.insert(neighbor)
                    {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        revealed
    }
}

fn has_shape<T>(grid: &[Vec<T>], height: usize, width: usize) -> bool {
    grid.len() == height && grid.iter().all(|row| row.len() == width)
}
