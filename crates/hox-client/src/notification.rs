//! Upward interface: what the session reports to whoever renders it.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use hox_core::moves::MoveInfo;
use hox_core::protocol::{Color, ErrorCode, GameStatus};
use hox_core::table::{PlayerInfo, PlayerRecord, TableSession};

use crate::transport::LifecycleCode;

/// Kind of a [`MessageInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    TableChat,
    PrivateChat,
    Invite,
}

/// A chat line or invitation addressed to the local player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageInfo {
    pub kind: MessageKind,
    pub sender: String,
    pub content: String,
    /// The table the message belongs to, empty for private chat and `?`
    /// for an invitation that named no table.
    pub table_id: String,
}

/// Everything the session can tell its listeners, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Notification {
    /// A lifecycle code from the transport that is not a fault.
    Connection(LifecycleCode),
    LoginResult {
        ok: bool,
        error: Option<ErrorCode>,
    },
    /// Our own logout completed.
    LoggedOut,
    TableEntered(TableSession),
    /// The current table is gone: we left it or the connection dropped.
    TableClosed,
    LocalRoleChanged(Color),
    PlayerJoined {
        pid: String,
        rating: String,
        color: Color,
    },
    PlayerLeft {
        pid: String,
    },
    MoveReceived(MoveInfo),
    /// The move list replayed after entering a table.
    MovesRestored(Vec<MoveInfo>),
    GameEnded(GameStatus),
    GameReset,
    DrawOffered {
        pid: String,
    },
    Message(MessageInfo),
    TablesListed(Vec<TableSession>),
    PlayersListed(Vec<PlayerInfo>),
    PlayerLoggedIn(PlayerInfo),
    PlayerLoggedOut {
        pid: String,
    },
    PlayerRecord(PlayerRecord),
    ScoreUpdated {
        pid: String,
        rating: String,
    },
    /// The server refused an operation with a non-zero code.
    RequestFailed {
        op: String,
        code: ErrorCode,
    },
    NetworkFault(LifecycleCode),
}

/// Receives every [`Notification`] the controller emits.
pub trait SessionListener: Send {
    fn notify(&mut self, notification: &Notification);
}

impl SessionListener for UnboundedSender<Notification> {
    fn notify(&mut self, notification: &Notification) {
        // A listener that went away simply stops hearing about the session.
        let _ = self.send(notification.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_serialize_with_event_tag() {
        let json = serde_json::to_value(Notification::LoginResult {
            ok: false,
            error: Some(ErrorCode::WrongPassword),
        })
        .unwrap();
        assert_eq!(json["event"], "login_result");
        assert_eq!(json["data"]["error"], "wrong_password");

        let json = serde_json::to_value(Notification::NetworkFault(LifecycleCode::IoError)).unwrap();
        assert_eq!(json["data"], "io_error");

        let json = serde_json::to_value(Notification::GameReset).unwrap();
        assert_eq!(json["event"], "game_reset");
    }

    #[test]
    fn channel_listener_forwards_clones() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut listener = tx;
        listener.notify(&Notification::TableClosed);
        assert_eq!(rx.try_recv().unwrap(), Notification::TableClosed);
    }
}
