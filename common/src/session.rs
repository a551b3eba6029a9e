use crate::{Cell, Game, KnowledgeBase, Reveal};

/// A game together with everything the player has deduced about it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Session {
    pub game: Game,
    pub knowledge: KnowledgeBase,
}

impl Session {
    pub fn new(width: usize, height: usize, total_mines: usize, seed: u64) -> anyhow::Result<Self> {
        let game = Game::new(width, height, total_mines, seed)?;
        let knowledge = KnowledgeBase::new(height, width);
        Ok(Session { game, knowledge })
    }

    /// Opens a tile and feeds every clue it uncovers to the knowledge base.
    pub fn reveal(&mut self, at: Cell) -> anyhow::Result<Reveal> {
        let reveal = self.game.reveal_cell(at)?;
        if let Reveal::Opened(revealed) = &reveal {
            for &(cell, count) in revealed {
                self.knowledge.observe(cell, count)?;
            }
        }
        Ok(reveal)
    }

    /// Deserializes a session from bytes, rejecting boards whose stored
    /// dimensions disagree with each other.
    pub fn deserialize(bts: &[u8]) -> anyhow::Result<Self> {
        let session: Session = bcs::from_bytes(bts)?;
        session.game.check_shape()?;
        if session.knowledge.height() != session.game.height
            || session.knowledge.width() != session.game.width
        {
            anyhow::bail!(
                "knowledge covers {}x{} but the board is {}x{}",
                session.knowledge.height(),
                session.knowledge.width(),
                session.game.height,
                session.game.width
            );
        }
        Ok(session)
    }

    /// Serializes the session to bytes.
    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }
}
