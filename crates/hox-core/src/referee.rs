//! Move-legality oracle seam.
//!
//! The session layer never interprets the board itself. It asks a
//! [`Referee`] whether each server-reported move is acceptable and what the
//! game status is afterwards, and resets it when the board is reset or a new
//! table is entered.

use crate::moves::{MoveInfo, Position};
use crate::protocol::GameStatus;

pub trait Referee: Send {
    /// Validate and record a move. `None` means the move was rejected and
    /// must not be applied.
    fn validate_move(&mut self, from: Position, to: Position) -> Option<GameStatus>;

    /// Forget every recorded move.
    fn reset(&mut self);

    /// Number of moves accepted since the last reset.
    fn move_count(&self) -> usize;
}

/// Default oracle: accepts any on-board move that goes somewhere, and keeps
/// the accepted moves in order.
#[derive(Debug, Default, Clone)]
pub struct MoveHistory {
    moves: Vec<MoveInfo>,
}

impl MoveHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn moves(&self) -> &[MoveInfo] {
        &self.moves
    }
}

impl Referee for MoveHistory {
    fn validate_move(&mut self, from: Position, to: Position) -> Option<GameStatus> {
        if !from.on_board() || !to.on_board() || from == to {
            return None;
        }
        let mut mv = MoveInfo::new(from, to);
        mv.status = GameStatus::InProgress;
        self.moves.push(mv);
        Some(mv.status)
    }

    fn reset(&mut self) {
        self.moves.clear();
    }

    fn move_count(&self) -> usize {
        self.moves.len()
    }
}
