//! A Minesweeper player that only moves on what it can prove.
//!
//! [`KnowledgeBase`] turns revealed clues into constraints and runs them to a
//! fixpoint, publishing every cell it can prove to be a mine or safe. The
//! [`Game`] board and the SAT-backed [`oracle`] sit around it: the first to
//! drive it, the second to audit it. A [`Session`] pairs a game with its
//! knowledge base and persists both.

mod cell;
mod constraint;
mod error;
pub mod game;
mod knowledge;
pub mod oracle;
mod selector;
mod session;

pub use cell::Cell;
pub use constraint::{Constraint, Inconsistency};
pub use error::InvalidObservation;
pub use game::{Game, GameState, Reveal, Tile};
pub use knowledge::{KnowledgeBase, MAX_CLUE};
pub use selector::Move;
pub use session::Session;
