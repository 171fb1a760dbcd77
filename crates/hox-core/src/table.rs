//! Table, player, and timing records decoded from server content fields.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::{Color, DecodeError};

/// Game/move/free time allowance, in seconds. Wire form is `game/move/free`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpec {
    pub game: u32,
    pub moves: u32,
    pub free: u32,
}

impl TimeSpec {
    /// The allowance new tables are opened with: 15m game, 3m move, 20s free.
    pub const DEFAULT_INITIAL: TimeSpec = TimeSpec {
        game: 900,
        moves: 180,
        free: 20,
    };

    /// Parse `game[/move[/free]]`. Missing components are zero, and an empty
    /// string is an all-zero spec.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        let mut parts = [0u32; 3];
        if !text.is_empty() {
            let fields: Vec<&str> = text.split('/').collect();
            if fields.len() > 3 {
                return Err(DecodeError::InvalidTime(text.to_string()));
            }
            for (slot, field) in parts.iter_mut().zip(fields) {
                *slot = field
                    .parse()
                    .map_err(|_| DecodeError::InvalidTime(text.to_string()))?;
            }
        }
        Ok(Self {
            game: parts[0],
            moves: parts[1],
            free: parts[2],
        })
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.game, self.moves, self.free)
    }
}

/// A player id with its rating, as listed by `I_PLAYERS` and `LOGIN`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub pid: String,
    pub rating: String,
}

impl PlayerInfo {
    pub fn new(pid: impl Into<String>, rating: impl Into<String>) -> Self {
        Self {
            pid: pid.into(),
            rating: rating.into(),
        }
    }

    /// Parse a `pid;rating` entry.
    pub fn parse(entry: &str) -> Result<Self, DecodeError> {
        let fields: Vec<&str> = entry.split(';').collect();
        if fields.len() < 2 {
            return Err(DecodeError::field_count("I_PLAYERS", 2, fields.len()));
        }
        Ok(Self::new(fields[0], fields[1]))
    }
}

impl fmt::Display for PlayerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_seat(&self.pid, &self.rating))
    }
}

/// Win/draw/loss record returned by `PLAYER_INFO`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub pid: String,
    pub rating: String,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

/// Render a seat as `pid(rating)`, or `*` when nobody sits there.
pub fn format_seat(pid: &str, rating: &str) -> String {
    if pid.is_empty() {
        "*".to_string()
    } else {
        format!("{pid}({rating})")
    }
}

/// Everything known about one table.
///
/// An empty `table_id` means "no table"; see [`TableSession::is_valid`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSession {
    pub table_id: String,
    pub rated: bool,
    pub initial_time: TimeSpec,
    pub red_time: TimeSpec,
    pub black_time: TimeSpec,
    pub red_id: String,
    pub red_rating: String,
    pub black_id: String,
    pub black_rating: String,
    pub observers: Vec<String>,
}

impl TableSession {
    /// Number of fixed fields before the observer list.
    const FIXED_FIELDS: usize = 10;

    /// Parse a `;`-separated table record, as carried by `I_TABLE` and each
    /// line of `LIST`:
    ///
    /// `tid;<unused>;rated;itimes;redTimes;blackTimes;redId;redRating;blackId;blackRating;observer*`
    ///
    /// The server sends `0` in the `rated` slot for rated tables.
    pub fn parse(content: &str) -> Result<Self, DecodeError> {
        let fields: Vec<&str> = content.split(';').collect();
        if fields.len() < Self::FIXED_FIELDS {
            return Err(DecodeError::field_count(
                "I_TABLE",
                Self::FIXED_FIELDS,
                fields.len(),
            ));
        }
        if fields[0].is_empty() {
            return Err(DecodeError::MissingKey("tid"));
        }

        Ok(Self {
            table_id: fields[0].to_string(),
            rated: fields[2] == "0",
            initial_time: TimeSpec::parse(fields[3])?,
            red_time: TimeSpec::parse(fields[4])?,
            black_time: TimeSpec::parse(fields[5])?,
            red_id: fields[6].to_string(),
            red_rating: fields[7].to_string(),
            black_id: fields[8].to_string(),
            black_rating: fields[9].to_string(),
            observers: fields[Self::FIXED_FIELDS..]
                .iter()
                .filter(|o| !o.is_empty())
                .map(|o| o.to_string())
                .collect(),
        })
    }

    pub fn is_valid(&self) -> bool {
        !self.table_id.is_empty()
    }

    pub fn has_id(&self, tid: &str) -> bool {
        self.is_valid() && self.table_id == tid
    }

    /// The role `pid` holds at this table.
    pub fn color_of(&self, pid: &str) -> Color {
        if !pid.is_empty() && self.black_id == pid {
            Color::Black
        } else if !pid.is_empty() && self.red_id == pid {
            Color::Red
        } else {
            Color::Observer
        }
    }

    /// Apply an `E_JOIN`: seat the player, or unseat them into the
    /// observer list when `color` is [`Color::Observer`].
    pub fn on_player_joined(&mut self, pid: &str, rating: &str, color: Color) {
        match color {
            Color::Red => {
                self.vacate_seat(pid);
                self.observers.retain(|o| o != pid);
                self.red_id = pid.to_string();
                self.red_rating = rating.to_string();
            }
            Color::Black => {
                self.vacate_seat(pid);
                self.observers.retain(|o| o != pid);
                self.black_id = pid.to_string();
                self.black_rating = rating.to_string();
            }
            Color::Observer => {
                self.vacate_seat(pid);
                if !self.observers.iter().any(|o| o == pid) {
                    self.observers.push(pid.to_string());
                }
            }
            Color::Unknown => {}
        }
    }

    /// Apply a `LEAVE` of someone other than the local player.
    pub fn on_player_left(&mut self, pid: &str) {
        self.vacate_seat(pid);
        self.observers.retain(|o| o != pid);
    }

    /// Update the rating shown for a seated player. Returns whether a seat
    /// matched.
    pub fn update_rating(&mut self, pid: &str, rating: &str) -> bool {
        if !pid.is_empty() && self.red_id == pid {
            self.red_rating = rating.to_string();
            true
        } else if !pid.is_empty() && self.black_id == pid {
            self.black_rating = rating.to_string();
            true
        } else {
            false
        }
    }

    pub fn red_info(&self) -> String {
        format_seat(&self.red_id, &self.red_rating)
    }

    pub fn black_info(&self) -> String {
        format_seat(&self.black_id, &self.black_rating)
    }

    pub fn red_seat_empty(&self) -> bool {
        self.red_id.is_empty()
    }

    pub fn black_seat_empty(&self) -> bool {
        self.black_id.is_empty()
    }

    fn vacate_seat(&mut self, pid: &str) {
        if pid.is_empty() {
            return;
        }
        if self.black_id == pid {
            self.black_id.clear();
            self.black_rating = "0".to_string();
        }
        if self.red_id == pid {
            self.red_id.clear();
            self.red_rating = "0".to_string();
        }
    }
}

impl fmt::Display for TableSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {}",
            self.table_id,
            self.initial_time,
            self.red_info(),
            self.black_info()
        )
    }
}
