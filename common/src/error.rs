//! Errors raised by the knowledge base.

use thiserror::Error;

use crate::Cell;

/// A rejected call to [`KnowledgeBase::observe`](crate::KnowledgeBase::observe).
///
/// These signal a programming error in the caller. The knowledge base is left
/// exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidObservation {
    #[error("cell {cell} is outside the {height}x{width} board")]
    OutOfBounds {
        cell: Cell,
        height: usize,
        width: usize,
    },

    #[error("mine count {count} at {cell} is out of range (must be 0-8)")]
    CountOutOfRange { cell: Cell, count: u8 },

    #[error("cell {cell} has already been observed")]
    AlreadyObserved { cell: Cell },

    #[error("observation {count} at {cell} contradicts known facts: {reason}")]
    Contradiction {
        cell: Cell,
        count: u8,
        reason: &'static str,
    },
}
