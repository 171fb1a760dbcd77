//! Outbound commands and their wire rendering.
//!
//! Every request is one line, `op=<NAME>&pid=<id>` followed by the
//! command's own parameters in a fixed order. No escaping is applied; the
//! server treats `&` and `=` in values as separators, so callers must not
//! put them in chat text.

use serde::{Deserialize, Serialize};

use crate::moves::MoveInfo;
use crate::protocol::Color;
use crate::table::TimeSpec;

/// Recipient of a `MSG`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatTarget {
    /// Everyone at a table.
    Table(String),
    /// A single player.
    Player(String),
}

/// A command the client can send to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    Login { version: String, password: String },
    Logout,
    List,
    Join { tid: String, color: Color },
    Leave { tid: String },
    New { itimes: TimeSpec },
    Move { tid: String, mv: MoveInfo },
    Draw { tid: String },
    Resign { tid: String },
    Reset { tid: String },
    Msg { target: ChatTarget, msg: String },
    Invite { oid: String, tid: String },
    PlayerInfo { oid: String },
}

impl Request {
    /// The wire name of the operation.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Login { .. } => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::List => "LIST",
            Self::Join { .. } => "JOIN",
            Self::Leave { .. } => "LEAVE",
            Self::New { .. } => "NEW",
            Self::Move { .. } => "MOVE",
            Self::Draw { .. } => "DRAW",
            Self::Resign { .. } => "RESIGN",
            Self::Reset { .. } => "RESET",
            Self::Msg { .. } => "MSG",
            Self::Invite { .. } => "INVITE",
            Self::PlayerInfo { .. } => "PLAYER_INFO",
        }
    }

    /// Parameters after `pid`, in wire order.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Login { version, password } => {
                vec![("version", version.clone()), ("password", password.clone())]
            }
            Self::Logout | Self::List => Vec::new(),
            Self::Join { tid, color } => vec![
                ("tid", tid.clone()),
                // Unknown is never requested; fall back to observing.
                ("color", color.wire_name().unwrap_or("None").to_string()),
            ],
            Self::Leave { tid } | Self::Draw { tid } | Self::Resign { tid } | Self::Reset { tid } => {
                vec![("tid", tid.clone())]
            }
            Self::New { itimes } => vec![("itimes", itimes.to_string())],
            Self::Move { tid, mv } => vec![("tid", tid.clone()), ("move", mv.to_wire())],
            Self::Msg { target, msg } => {
                let to = match target {
                    ChatTarget::Table(tid) => ("tid", tid.clone()),
                    ChatTarget::Player(oid) => ("oid", oid.clone()),
                };
                vec![to, ("msg", msg.clone())]
            }
            Self::Invite { oid, tid } => vec![("oid", oid.clone()), ("tid", tid.clone())],
            Self::PlayerInfo { oid } => vec![("oid", oid.clone())],
        }
    }

    /// Render the request line for player `pid`, without the terminator.
    pub fn render(&self, pid: &str) -> String {
        let mut line = format!("op={}&pid={}", self.op(), pid);
        for (key, value) in self.params() {
            line.push('&');
            line.push_str(key);
            line.push('=');
            line.push_str(&value);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_carries_version_and_password() {
        let req = Request::Login {
            version: "AOXChess-1.0".into(),
            password: "secret".into(),
        };
        assert_eq!(
            req.render("bob"),
            "op=LOGIN&pid=bob&version=AOXChess-1.0&password=secret"
        );
    }

    #[test]
    fn table_commands() {
        assert_eq!(Request::List.render("bob"), "op=LIST&pid=bob");
        assert_eq!(Request::Logout.render("bob"), "op=LOGOUT&pid=bob");
        assert_eq!(
            Request::Join {
                tid: "7".into(),
                color: Color::Observer
            }
            .render("bob"),
            "op=JOIN&pid=bob&tid=7&color=None"
        );
        assert_eq!(
            Request::New {
                itimes: TimeSpec::DEFAULT_INITIAL
            }
            .render("bob"),
            "op=NEW&pid=bob&itimes=900/180/20"
        );
        assert_eq!(
            Request::Resign { tid: "7".into() }.render("bob"),
            "op=RESIGN&pid=bob&tid=7"
        );
    }

    #[test]
    fn move_is_rendered_column_first() {
        let req = Request::Move {
            tid: "7".into(),
            mv: MoveInfo::parse("1242").unwrap(),
        };
        assert_eq!(req.render("bob"), "op=MOVE&pid=bob&tid=7&move=1242");
    }

    #[test]
    fn chat_targets() {
        let table = Request::Msg {
            target: ChatTarget::Table("7".into()),
            msg: "hi".into(),
        };
        assert_eq!(table.render("bob"), "op=MSG&pid=bob&tid=7&msg=hi");

        let private = Request::Msg {
            target: ChatTarget::Player("ann".into()),
            msg: "hi".into(),
        };
        assert_eq!(private.render("bob"), "op=MSG&pid=bob&oid=ann&msg=hi");

        assert_eq!(
            Request::Invite {
                oid: "ann".into(),
                tid: "7".into()
            }
            .render("bob"),
            "op=INVITE&pid=bob&oid=ann&tid=7"
        );
        assert_eq!(
            Request::PlayerInfo { oid: "ann".into() }.render("bob"),
            "op=PLAYER_INFO&pid=bob&oid=ann"
        );
    }
}
