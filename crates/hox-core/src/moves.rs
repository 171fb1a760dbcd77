//! Board positions and moves as they appear on the wire.
//!
//! The server encodes a move as four ASCII digits,
//! `<fromCol><fromRow><toCol><toRow>`, and a move list as those strings
//! joined with `/`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::{DecodeError, GameStatus};

/// Number of files (columns) on a xiangqi board.
pub const BOARD_COLUMNS: u8 = 9;
/// Number of ranks (rows) on a xiangqi board.
pub const BOARD_ROWS: u8 = 10;

/// A point on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Whether the point lies on the 9x10 board.
    pub fn on_board(self) -> bool {
        self.row < BOARD_ROWS && self.col < BOARD_COLUMNS
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A single move, plus the game status the referee computed for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveInfo {
    pub from: Position,
    pub to: Position,
    /// [`GameStatus::Unknown`] until the move has been validated.
    pub status: GameStatus,
}

impl MoveInfo {
    pub fn new(from: Position, to: Position) -> Self {
        Self {
            from,
            to,
            status: GameStatus::Unknown,
        }
    }

    /// Parse one `<fromCol><fromRow><toCol><toRow>` move.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        let digits: Vec<u8> = text
            .bytes()
            .map(|b| if b.is_ascii_digit() { Some(b - b'0') } else { None })
            .collect::<Option<_>>()
            .ok_or_else(|| DecodeError::InvalidMove(text.to_string()))?;

        let [from_col, from_row, to_col, to_row] = digits[..] else {
            return Err(DecodeError::InvalidMove(text.to_string()));
        };
        Ok(Self::new(
            Position::new(from_row, from_col),
            Position::new(to_row, to_col),
        ))
    }

    /// Parse a `/`-separated move list. An empty string is an empty list.
    pub fn parse_list(text: &str) -> Result<Vec<Self>, DecodeError> {
        text.split('/')
            .filter(|m| !m.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Render in wire form.
    pub fn to_wire(&self) -> String {
        format!(
            "{}{}{}{}",
            self.from.col, self.from.row, self.to.col, self.to.row
        )
    }
}

impl fmt::Display for MoveInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {} ({})", self.from, self.to, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_column_before_row() {
        let mv = MoveInfo::parse("1242").unwrap();
        assert_eq!(mv.from, Position::new(2, 1));
        assert_eq!(mv.to, Position::new(2, 4));
        assert_eq!(mv.status, GameStatus::Unknown);
        assert_eq!(mv.to_wire(), "1242");
    }

    #[test]
    fn parse_rejects_bad_moves() {
        assert!(MoveInfo::parse("124").is_err());
        assert!(MoveInfo::parse("12425").is_err());
        assert!(MoveInfo::parse("12a2").is_err());
        assert!(MoveInfo::parse("").is_err());
    }

    #[test]
    fn parse_list_splits_on_slash() {
        let moves = MoveInfo::parse_list("1242/7967/").unwrap();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[1].from, Position::new(9, 7));
        assert_eq!(moves[1].to, Position::new(7, 6));
        assert!(MoveInfo::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn on_board_bounds() {
        assert!(Position::new(9, 8).on_board());
        assert!(!Position::new(10, 0).on_board());
        assert!(!Position::new(0, 9).on_board());
    }
}
