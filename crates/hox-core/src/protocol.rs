//! Inbound event vocabulary of the HOX game server.
//!
//! Every frame body is a `key=value&key=value` line carrying at least `op`
//! and `code`, usually `content`, and `tid` for table-scoped chat. The
//! meaning of `content` depends on `op`: it is a `;`-separated record whose
//! layout is fixed per operation, or a `\n`-separated list of such records.
//!
//! [`ServerEvent::parse`] turns one frame body into a typed event, failing
//! with a [`DecodeError`] when a field is missing or a record is too short.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::moves::MoveInfo;
use crate::table::{PlayerInfo, PlayerRecord, TableSession};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A frame or content field the decoder could not make sense of.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing `{0}` field")]
    MissingKey(&'static str),

    #[error("malformed key/value pair `{0}`")]
    MalformedPair(String),

    #[error("invalid code `{0}`")]
    InvalidCode(String),

    #[error("{op}: expected at least {expected} fields, got {got}")]
    FieldCount {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    #[error("invalid move `{0}`")]
    InvalidMove(String),

    #[error("invalid time spec `{0}`")]
    InvalidTime(String),
}

impl DecodeError {
    pub(crate) fn field_count(op: &'static str, expected: usize, got: usize) -> Self {
        Self::FieldCount { op, expected, got }
    }
}

// ---------------------------------------------------------------------------
// Enumerations shared with the request side
// ---------------------------------------------------------------------------

/// A player's role at a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Not at any table.
    #[default]
    Unknown,
    Red,
    Black,
    /// At the table without a seat.
    Observer,
}

impl Color {
    /// Decode the wire spelling (`Red`, `Black`, `None`).
    pub fn from_wire(text: &str) -> Self {
        match text {
            "Red" => Self::Red,
            "Black" => Self::Black,
            "None" => Self::Observer,
            _ => Self::Unknown,
        }
    }

    /// The wire spelling, if this role can be requested.
    pub fn wire_name(self) -> Option<&'static str> {
        match self {
            Self::Red => Some("Red"),
            Self::Black => Some("Black"),
            Self::Observer => Some("None"),
            Self::Unknown => None,
        }
    }

    /// Red or black.
    pub fn is_seated(self) -> bool {
        matches!(self, Self::Red | Self::Black)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Red => "red",
            Self::Black => "black",
            Self::Observer => "observer",
        })
    }
}

/// Where the game at the current table stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Unknown,
    InProgress,
    RedWin,
    BlackWin,
    Drawn,
}

impl GameStatus {
    /// Decode an `E_END` result (`red_win`, `black_win`, `drawn`).
    pub fn from_result(text: &str) -> Self {
        match text {
            "red_win" => Self::RedWin,
            "black_win" => Self::BlackWin,
            "drawn" => Self::Drawn,
            _ => Self::Unknown,
        }
    }

    pub fn is_over(self) -> bool {
        matches!(self, Self::RedWin | Self::BlackWin | Self::Drawn)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::InProgress => "in progress",
            Self::RedWin => "red wins",
            Self::BlackWin => "black wins",
            Self::Drawn => "drawn",
        })
    }
}

/// A non-zero `code` reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// `6`: the password did not match.
    WrongPassword,
    /// `7`: unknown player, table, or other target.
    NotFound,
    Other(i32),
}

impl ErrorCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            6 => Self::WrongPassword,
            7 => Self::NotFound,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::WrongPassword => 6,
            Self::NotFound => 7,
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongPassword => f.write_str("wrong password"),
            Self::NotFound => f.write_str("not found"),
            Self::Other(code) => write!(f, "error {code}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw key/value layer
// ---------------------------------------------------------------------------

/// The `&`-separated pairs of one frame, in wire order.
///
/// A repeated key keeps its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFields {
    pairs: Vec<(String, String)>,
}

impl EventFields {
    pub fn parse(frame: &str) -> Result<Self, DecodeError> {
        let mut fields = Self::default();
        for token in frame.split('&').filter(|t| !t.is_empty()) {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| DecodeError::MalformedPair(token.to_string()))?;
            match fields.pairs.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value.to_string(),
                None => fields.pairs.push((key.to_string(), value.to_string())),
            }
        }
        Ok(fields)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Typed events
// ---------------------------------------------------------------------------

/// One decoded server event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// `LOGIN` with code 0: a player (possibly us) logged in.
    Login { pid: String, rating: String },
    /// `LOGIN` with a non-zero code: our login was refused.
    LoginFailed { code: ErrorCode, reason: String },
    /// `LIST`: the tables currently open.
    List { tables: Vec<TableSession> },
    /// `I_TABLE`: full description of the table we just entered.
    Table(TableSession),
    /// `I_MOVES`: every move played so far at a table.
    Moves { tid: String, moves: Vec<MoveInfo> },
    /// `MOVE`: one new move at a table.
    Move { tid: String, mv: MoveInfo },
    /// `LEAVE`: a player left a table.
    Leave { tid: String, pid: String },
    /// `E_JOIN`: a player took a seat or became an observer.
    Join {
        tid: String,
        pid: String,
        rating: String,
        color: Color,
    },
    /// `E_END`: the game at a table finished.
    End { tid: String, status: GameStatus },
    /// `RESET`: a table's board was reset.
    Reset { tid: String },
    /// `DRAW`: a player offered a draw.
    Draw { tid: String, pid: String },
    /// `MSG`: chat. `tid` is present only for table chat.
    Message {
        sender: String,
        text: String,
        tid: Option<String>,
    },
    /// `INVITE`: an invitation to play.
    Invite {
        sender: String,
        rating: String,
        invitee: String,
        tid: Option<String>,
    },
    /// `I_PLAYERS`: every player online.
    Players { players: Vec<PlayerInfo> },
    /// `LOGOUT`: a player went offline.
    Logout { pid: String },
    /// `PLAYER_INFO`: a player's record.
    PlayerInfo(PlayerRecord),
    /// `E_SCORE`: a player's rating changed.
    Score {
        tid: String,
        pid: String,
        rating: String,
    },
    /// A non-zero `code` on any operation other than `LOGIN`.
    Failed {
        op: String,
        code: ErrorCode,
        content: String,
    },
    /// An `op` this client does not handle.
    Unsupported { op: String },
}

impl ServerEvent {
    /// Decode one frame body.
    pub fn parse(frame: &str) -> Result<Self, DecodeError> {
        let fields = EventFields::parse(frame)?;
        let op = fields.get("op").ok_or(DecodeError::MissingKey("op"))?;
        let code_text = fields.get("code").ok_or(DecodeError::MissingKey("code"))?;
        let code: i32 = code_text
            .trim()
            .parse()
            .map_err(|_| DecodeError::InvalidCode(code_text.to_string()))?;
        let content = fields.get("content").unwrap_or("");
        let tid = fields.get("tid").filter(|t| !t.is_empty()).map(str::to_string);

        if op == "LOGIN" {
            if code != 0 {
                return Ok(Self::LoginFailed {
                    code: ErrorCode::from_code(code),
                    reason: content.to_string(),
                });
            }
            let [pid, rating] = split_fixed::<2>("LOGIN", content)?;
            return Ok(Self::Login {
                pid: pid.to_string(),
                rating: rating.to_string(),
            });
        }

        if code != 0 {
            return Ok(Self::Failed {
                op: op.to_string(),
                code: ErrorCode::from_code(code),
                content: content.to_string(),
            });
        }

        let event = match op {
            "LIST" => Self::List {
                tables: lines(content)
                    .map(TableSession::parse)
                    .collect::<Result<_, _>>()?,
            },
            "I_TABLE" => Self::Table(TableSession::parse(content)?),
            "I_MOVES" => {
                let (tid, moves) = content.split_once(';').unwrap_or((content, ""));
                Self::Moves {
                    tid: require_tid(tid)?,
                    moves: MoveInfo::parse_list(moves)?,
                }
            }
            "MOVE" => {
                let [tid, _, mv] = split_fixed::<3>("MOVE", content)?;
                Self::Move {
                    tid: require_tid(tid)?,
                    mv: MoveInfo::parse(mv)?,
                }
            }
            "LEAVE" => {
                let [tid, pid] = split_fixed::<2>("LEAVE", content)?;
                Self::Leave {
                    tid: require_tid(tid)?,
                    pid: pid.to_string(),
                }
            }
            "E_JOIN" => {
                let [tid, pid, rating, color] = split_fixed::<4>("E_JOIN", content)?;
                Self::Join {
                    tid: require_tid(tid)?,
                    pid: pid.to_string(),
                    rating: rating.to_string(),
                    color: Color::from_wire(color),
                }
            }
            "E_END" => {
                let [tid, result] = split_fixed::<2>("E_END", content)?;
                Self::End {
                    tid: require_tid(tid)?,
                    status: GameStatus::from_result(result),
                }
            }
            "RESET" => {
                let [tid] = split_fixed::<1>("RESET", content)?;
                Self::Reset {
                    tid: require_tid(tid)?,
                }
            }
            "DRAW" => {
                let [tid, pid] = split_fixed::<2>("DRAW", content)?;
                Self::Draw {
                    tid: require_tid(tid)?,
                    pid: pid.to_string(),
                }
            }
            "MSG" => {
                let (sender, text) = content
                    .split_once(';')
                    .ok_or(DecodeError::field_count("MSG", 2, 1))?;
                Self::Message {
                    sender: sender.to_string(),
                    text: text.to_string(),
                    tid,
                }
            }
            "INVITE" => {
                let [sender, rating, invitee] = split_fixed::<3>("INVITE", content)?;
                Self::Invite {
                    sender: sender.to_string(),
                    rating: rating.to_string(),
                    invitee: invitee.to_string(),
                    tid,
                }
            }
            "I_PLAYERS" => Self::Players {
                players: lines(content)
                    .map(PlayerInfo::parse)
                    .collect::<Result<_, _>>()?,
            },
            "LOGOUT" => Self::Logout {
                pid: content.to_string(),
            },
            "PLAYER_INFO" => {
                let [pid, rating, wins, draws, losses] =
                    split_fixed::<5>("PLAYER_INFO", content)?;
                Self::PlayerInfo(PlayerRecord {
                    pid: pid.to_string(),
                    rating: rating.to_string(),
                    wins: parse_count(wins)?,
                    draws: parse_count(draws)?,
                    losses: parse_count(losses)?,
                })
            }
            "E_SCORE" => {
                let [tid, pid, rating] = split_fixed::<3>("E_SCORE", content)?;
                Self::Score {
                    tid: require_tid(tid)?,
                    pid: pid.to_string(),
                    rating: rating.to_string(),
                }
            }
            other => Self::Unsupported {
                op: other.to_string(),
            },
        };
        Ok(event)
    }

    /// The wire name of the operation this event came from.
    pub fn op(&self) -> &str {
        match self {
            Self::Login { .. } | Self::LoginFailed { .. } => "LOGIN",
            Self::List { .. } => "LIST",
            Self::Table(_) => "I_TABLE",
            Self::Moves { .. } => "I_MOVES",
            Self::Move { .. } => "MOVE",
            Self::Leave { .. } => "LEAVE",
            Self::Join { .. } => "E_JOIN",
            Self::End { .. } => "E_END",
            Self::Reset { .. } => "RESET",
            Self::Draw { .. } => "DRAW",
            Self::Message { .. } => "MSG",
            Self::Invite { .. } => "INVITE",
            Self::Players { .. } => "I_PLAYERS",
            Self::Logout { .. } => "LOGOUT",
            Self::PlayerInfo(_) => "PLAYER_INFO",
            Self::Score { .. } => "E_SCORE",
            Self::Failed { op, .. } | Self::Unsupported { op } => op.as_str(),
        }
    }

    /// The table this event is about, for events that only make sense at
    /// the table the client currently has open.
    ///
    /// `None` for table-independent events, including `I_TABLE` (which
    /// replaces the current table), `INVITE`, and private `MSG`.
    pub fn scoped_table(&self) -> Option<&str> {
        match self {
            Self::Moves { tid, .. }
            | Self::Move { tid, .. }
            | Self::Leave { tid, .. }
            | Self::Join { tid, .. }
            | Self::End { tid, .. }
            | Self::Reset { tid }
            | Self::Draw { tid, .. }
            | Self::Score { tid, .. } => Some(tid),
            Self::Message { tid, .. } => tid.as_deref(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Content helpers
// ---------------------------------------------------------------------------

/// Split `content` on `;` and return its first `N` fields. Extra trailing
/// fields are ignored; too few is a [`DecodeError::FieldCount`].
fn split_fixed<'a, const N: usize>(
    op: &'static str,
    content: &'a str,
) -> Result<[&'a str; N], DecodeError> {
    let mut out = [""; N];
    let mut got = 0;
    for (slot, field) in out.iter_mut().zip(content.split(';')) {
        *slot = field;
        got += 1;
    }
    if got < N {
        return Err(DecodeError::field_count(op, N, got));
    }
    Ok(out)
}

fn lines(content: &str) -> impl Iterator<Item = &str> {
    content.split('\n').filter(|line| !line.trim().is_empty())
}

fn require_tid(tid: &str) -> Result<String, DecodeError> {
    if tid.is_empty() {
        Err(DecodeError::MissingKey("tid"))
    } else {
        Ok(tid.to_string())
    }
}

fn parse_count(text: &str) -> Result<u32, DecodeError> {
    text.trim()
        .parse()
        .map_err(|_| DecodeError::InvalidNumber(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::Position;

    #[test]
    fn fields_keep_order_and_split_on_first_equals() {
        let fields = EventFields::parse("op=MSG&code=0&content=ann;a=b&tid=7").unwrap();
        let keys: Vec<_> = fields.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["op", "code", "content", "tid"]);
        assert_eq!(fields.get("content"), Some("ann;a=b"));
        assert!(EventFields::parse("op=MSG&garbage").is_err());
    }

    #[test]
    fn login_success_and_failure() {
        assert_eq!(
            ServerEvent::parse("op=LOGIN&code=0&content=alice;1500").unwrap(),
            ServerEvent::Login {
                pid: "alice".into(),
                rating: "1500".into()
            }
        );
        assert_eq!(
            ServerEvent::parse("op=LOGIN&code=7&content=bad").unwrap(),
            ServerEvent::LoginFailed {
                code: ErrorCode::NotFound,
                reason: "bad".into()
            }
        );
    }

    #[test]
    fn missing_op_or_code_is_an_error() {
        assert_eq!(
            ServerEvent::parse("code=0&content=x"),
            Err(DecodeError::MissingKey("op"))
        );
        assert_eq!(
            ServerEvent::parse("op=LIST&content=x"),
            Err(DecodeError::MissingKey("code"))
        );
        assert!(matches!(
            ServerEvent::parse("op=LIST&code=zero"),
            Err(DecodeError::InvalidCode(_))
        ));
    }

    #[test]
    fn non_zero_code_is_scoped_to_its_operation() {
        let event = ServerEvent::parse("op=JOIN&code=7&content=no such table").unwrap();
        assert_eq!(
            event,
            ServerEvent::Failed {
                op: "JOIN".into(),
                code: ErrorCode::NotFound,
                content: "no such table".into()
            }
        );
        assert_eq!(event.op(), "JOIN");
        assert_eq!(event.scoped_table(), None);
    }

    #[test]
    fn move_event_reads_third_field() {
        let event = ServerEvent::parse("op=MOVE&code=0&content=42;bob;1242&tid=42").unwrap();
        let ServerEvent::Move { tid, mv } = &event else {
            panic!("expected MOVE, got {event:?}");
        };
        assert_eq!(tid, "42");
        assert_eq!(mv.from, Position::new(2, 1));
        assert_eq!(event.scoped_table(), Some("42"));
    }

    #[test]
    fn short_records_fail_loudly() {
        assert_eq!(
            ServerEvent::parse("op=E_JOIN&code=0&content=7;bob;1500"),
            Err(DecodeError::FieldCount {
                op: "E_JOIN",
                expected: 4,
                got: 3
            })
        );
        assert!(ServerEvent::parse("op=MSG&code=0&content=ann").is_err());
        assert!(ServerEvent::parse("op=RESET&code=0&content=").is_err());
    }

    #[test]
    fn moves_list_may_be_empty() {
        assert_eq!(
            ServerEvent::parse("op=I_MOVES&code=0&content=7;").unwrap(),
            ServerEvent::Moves {
                tid: "7".into(),
                moves: vec![]
            }
        );
        let ServerEvent::Moves { moves, .. } =
            ServerEvent::parse("op=I_MOVES&code=0&content=7;1242/7967").unwrap()
        else {
            panic!("expected I_MOVES");
        };
        assert_eq!(moves.len(), 2);
    }

    #[test]
    fn list_and_players_are_newline_separated() {
        let event = ServerEvent::parse(
            "op=LIST&code=0&content=1;0;0;900/180/20;900;900;;0;;0\n2;0;1;600/60/20;600;600;ann;1620;;0\n",
        )
        .unwrap();
        let ServerEvent::List { tables } = event else {
            panic!("expected LIST");
        };
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].red_id, "ann");

        let event = ServerEvent::parse("op=I_PLAYERS&code=0&content=ann;1620\nbob;1500").unwrap();
        assert_eq!(
            event,
            ServerEvent::Players {
                players: vec![PlayerInfo::new("ann", "1620"), PlayerInfo::new("bob", "1500")]
            }
        );
    }

    #[test]
    fn chat_scope_follows_tid_key() {
        let table = ServerEvent::parse("op=MSG&code=0&content=ann;hi;there&tid=7").unwrap();
        assert_eq!(table.scoped_table(), Some("7"));
        let ServerEvent::Message { text, .. } = &table else {
            panic!("expected MSG");
        };
        assert_eq!(text, "hi;there");

        let private = ServerEvent::parse("op=MSG&code=0&content=ann;psst").unwrap();
        assert_eq!(private.scoped_table(), None);
    }

    #[test]
    fn end_player_info_and_score() {
        assert_eq!(
            ServerEvent::parse("op=E_END&code=0&content=7;black_win").unwrap(),
            ServerEvent::End {
                tid: "7".into(),
                status: GameStatus::BlackWin
            }
        );
        let ServerEvent::PlayerInfo(record) =
            ServerEvent::parse("op=PLAYER_INFO&code=0&content=ann;1620;10;2;3").unwrap()
        else {
            panic!("expected PLAYER_INFO");
        };
        assert_eq!((record.wins, record.draws, record.losses), (10, 2, 3));
        assert!(ServerEvent::parse("op=PLAYER_INFO&code=0&content=ann;1620;ten;2;3").is_err());

        assert_eq!(
            ServerEvent::parse("op=E_SCORE&code=0&content=7;bob;1512").unwrap(),
            ServerEvent::Score {
                tid: "7".into(),
                pid: "bob".into(),
                rating: "1512".into()
            }
        );
    }

    #[test]
    fn unknown_ops_are_reported_not_rejected() {
        assert_eq!(
            ServerEvent::parse("op=PING&code=0").unwrap(),
            ServerEvent::Unsupported { op: "PING".into() }
        );
    }

    #[test]
    fn color_and_status_wire_names() {
        assert_eq!(Color::from_wire("None"), Color::Observer);
        assert_eq!(Color::from_wire("green"), Color::Unknown);
        assert_eq!(Color::Black.wire_name(), Some("Black"));
        assert_eq!(Color::Unknown.wire_name(), None);
        assert!(GameStatus::from_result("drawn").is_over());
        assert!(!GameStatus::from_result("abandoned").is_over());
        assert_eq!(ErrorCode::from_code(6), ErrorCode::WrongPassword);
        assert_eq!(ErrorCode::Other(3).code(), 3);
    }
}
