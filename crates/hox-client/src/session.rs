//! Session state and the reducers that apply server events to it.
//!
//! [`SessionState::apply`] is pure with respect to I/O: it mutates the
//! state, consults the [`Referee`] for moves, and returns the notifications
//! to emit. Deciding what to send in response is the controller's job.

use tracing::{debug, warn};

use hox_core::moves::MoveInfo;
use hox_core::protocol::{Color, GameStatus, ServerEvent};
use hox_core::referee::Referee;
use hox_core::table::{PlayerInfo, TableSession};

use crate::notification::{MessageInfo, MessageKind, Notification};
use crate::transport::LifecycleCode;

/// Where login stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    LoggedOut,
    AwaitingLogin,
    LoggedIn,
}

/// Who we are and where we sit.
///
/// `color` is [`Color::Unknown`] whenever there is no table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MyIdentity {
    pub pid: String,
    pub rating: String,
    pub color: Color,
    pub authenticated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub auth: AuthState,
    pub me: MyIdentity,
    pub table: TableSession,
    pub game_status: GameStatus,
}

impl SessionState {
    pub fn new(pid: impl Into<String>) -> Self {
        Self {
            me: MyIdentity {
                pid: pid.into(),
                ..MyIdentity::default()
            },
            ..Self::default()
        }
    }

    pub fn has_table(&self) -> bool {
        self.table.is_valid()
    }

    fn is_me(&self, pid: &str) -> bool {
        self.me.pid == pid
    }

    /// Forget the current table, our seat, and the game status.
    pub fn clear_table(&mut self, referee: &mut dyn Referee) {
        self.table = TableSession::default();
        self.me.color = Color::Unknown;
        self.game_status = GameStatus::Unknown;
        referee.reset();
    }

    /// Drop back to logged out, closing any table.
    ///
    /// Returns `TableClosed` when a table was open.
    pub fn sign_out(&mut self, referee: &mut dyn Referee) -> Option<Notification> {
        self.auth = AuthState::LoggedOut;
        self.me.authenticated = false;
        if self.has_table() {
            self.clear_table(referee);
            Some(Notification::TableClosed)
        } else {
            None
        }
    }

    /// Apply a lifecycle code. Faults end the session; the table cannot be
    /// assumed to survive a lost connection.
    pub fn apply_lifecycle(
        &mut self,
        code: LifecycleCode,
        referee: &mut dyn Referee,
    ) -> Vec<Notification> {
        let mut out = Vec::new();
        if code != LifecycleCode::Connected {
            out.extend(self.sign_out(referee));
        }
        if code.is_fault() {
            out.push(Notification::NetworkFault(code));
        } else {
            out.push(Notification::Connection(code));
        }
        out
    }

    /// Apply one decoded server event.
    pub fn apply(&mut self, event: ServerEvent, referee: &mut dyn Referee) -> Vec<Notification> {
        if let Some(tid) = event.scoped_table()
            && !self.table.has_id(tid)
        {
            warn!(op = event.op(), %tid, current = %self.table.table_id, "event for another table ignored");
            return Vec::new();
        }

        match event {
            ServerEvent::Login { pid, rating } => {
                if !self.is_me(&pid) {
                    return vec![Notification::PlayerLoggedIn(PlayerInfo::new(pid, rating))];
                }
                self.auth = AuthState::LoggedIn;
                self.me.authenticated = true;
                self.me.rating = rating;
                if !self.has_table() {
                    self.me.color = Color::Unknown;
                }
                vec![Notification::LoginResult {
                    ok: true,
                    error: None,
                }]
            }
            ServerEvent::LoginFailed { code, reason } => {
                warn!(%code, %reason, "login refused");
                self.auth = AuthState::LoggedOut;
                self.me.authenticated = false;
                vec![Notification::LoginResult {
                    ok: false,
                    error: Some(code),
                }]
            }
            ServerEvent::Logout { pid } => {
                if self.is_me(&pid) {
                    debug!("server confirmed our logout");
                    Vec::new()
                } else {
                    vec![Notification::PlayerLoggedOut { pid }]
                }
            }
            ServerEvent::List { tables } => vec![Notification::TablesListed(tables)],
            ServerEvent::Players { players } => vec![Notification::PlayersListed(players)],
            ServerEvent::PlayerInfo(record) => vec![Notification::PlayerRecord(record)],

            ServerEvent::Table(table) => {
                referee.reset();
                self.game_status = GameStatus::Unknown;
                self.me.color = table.color_of(&self.me.pid);
                self.table = table;
                vec![Notification::TableEntered(self.table.clone())]
            }
            ServerEvent::Moves { moves, .. } => {
                referee.reset();
                let mut restored = Vec::with_capacity(moves.len());
                for mv in moves {
                    match validate(referee, mv) {
                        Some(mv) => restored.push(mv),
                        None => break,
                    }
                }
                vec![Notification::MovesRestored(restored)]
            }
            ServerEvent::Move { mv, .. } => match validate(referee, mv) {
                Some(mv) => vec![Notification::MoveReceived(mv)],
                None => Vec::new(),
            },
            ServerEvent::Leave { pid, .. } => {
                if self.is_me(&pid) {
                    self.clear_table(referee);
                    vec![Notification::TableClosed]
                } else {
                    self.table.on_player_left(&pid);
                    vec![Notification::PlayerLeft { pid }]
                }
            }
            ServerEvent::Join {
                pid, rating, color, ..
            } => {
                if color == Color::Unknown {
                    warn!(%pid, "join with unknown color ignored");
                    return Vec::new();
                }
                self.table.on_player_joined(&pid, &rating, color);
                let mut out = Vec::with_capacity(2);
                if self.is_me(&pid) {
                    self.me.color = color;
                    out.push(Notification::LocalRoleChanged(color));
                }
                out.push(Notification::PlayerJoined { pid, rating, color });
                out
            }
            ServerEvent::End { status, .. } => {
                self.game_status = status;
                vec![Notification::GameEnded(status)]
            }
            ServerEvent::Reset { .. } => {
                self.game_status = GameStatus::Unknown;
                referee.reset();
                vec![Notification::GameReset]
            }
            ServerEvent::Draw { pid, .. } => vec![Notification::DrawOffered { pid }],
            ServerEvent::Score { pid, rating, .. } => {
                self.table.update_rating(&pid, &rating);
                if self.is_me(&pid) {
                    self.me.rating = rating.clone();
                }
                vec![Notification::ScoreUpdated { pid, rating }]
            }

            ServerEvent::Message { sender, text, tid } => {
                let (kind, table_id) = match tid {
                    Some(tid) => (MessageKind::TableChat, tid),
                    None => (MessageKind::PrivateChat, String::new()),
                };
                vec![Notification::Message(MessageInfo {
                    kind,
                    sender,
                    content: text,
                    table_id,
                })]
            }
            ServerEvent::Invite {
                sender,
                rating,
                invitee,
                tid,
            } => {
                if !self.is_me(&invitee) {
                    debug!(%invitee, "invite for someone else ignored");
                    return Vec::new();
                }
                let table_id = tid.unwrap_or_else(|| "?".to_string());
                vec![Notification::Message(MessageInfo {
                    kind: MessageKind::Invite,
                    content: format!("{sender}({rating}) invites you to table {table_id}"),
                    sender,
                    table_id,
                })]
            }

            ServerEvent::Failed { op, code, content } => {
                warn!(%op, %code, %content, "request failed");
                vec![Notification::RequestFailed { op, code }]
            }
            ServerEvent::Unsupported { op } => {
                debug!(%op, "unhandled event");
                Vec::new()
            }
        }
    }
}

/// Ask the referee about a server-reported move. Rejected moves are logged
/// and dropped.
fn validate(referee: &mut dyn Referee, mut mv: MoveInfo) -> Option<MoveInfo> {
    match referee.validate_move(mv.from, mv.to) {
        Some(status) => {
            mv.status = status;
            Some(mv)
        }
        None => {
            warn!(mv = %mv.to_wire(), "referee rejected move, dropped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hox_core::referee::MoveHistory;

    const BOB_TABLE: &str = "op=I_TABLE&code=0&content=7;0;0;900/180/20;900;900;bob;1500;;0";

    fn apply(state: &mut SessionState, referee: &mut MoveHistory, frame: &str) -> Vec<Notification> {
        let event = ServerEvent::parse(frame).unwrap();
        state.apply(event, referee)
    }

    fn seated_bob() -> (SessionState, MoveHistory) {
        let mut state = SessionState::new("bob");
        let mut referee = MoveHistory::new();
        apply(&mut state, &mut referee, "op=LOGIN&code=0&content=bob;1500");
        apply(&mut state, &mut referee, BOB_TABLE);
        (state, referee)
    }

    #[test]
    fn login_for_someone_else_is_a_roster_update() {
        let mut state = SessionState::new("bob");
        let mut referee = MoveHistory::new();
        let out = apply(&mut state, &mut referee, "op=LOGIN&code=0&content=ann;1620");
        assert_eq!(out, [Notification::PlayerLoggedIn(PlayerInfo::new("ann", "1620"))]);
        assert_eq!(state.auth, AuthState::LoggedOut);
    }

    #[test]
    fn table_entry_computes_color() {
        let (state, _) = seated_bob();
        assert_eq!(state.auth, AuthState::LoggedIn);
        assert_eq!(state.me.rating, "1500");
        assert_eq!(state.table.table_id, "7");
        assert_eq!(state.me.color, Color::Red);
        assert_eq!(state.game_status, GameStatus::Unknown);
    }

    #[test]
    fn foreign_table_move_changes_nothing() {
        let (mut state, mut referee) = seated_bob();
        let before = state.table.clone();
        let out = apply(&mut state, &mut referee, "op=MOVE&code=0&content=99;ann;1242&tid=99");
        assert!(out.is_empty());
        assert_eq!(state.table, before);
        assert_eq!(referee.move_count(), 0);
    }

    #[test]
    fn moves_go_through_referee() {
        let (mut state, mut referee) = seated_bob();
        let out = apply(&mut state, &mut referee, "op=MOVE&code=0&content=7;bob;1242");
        let [Notification::MoveReceived(mv)] = &out[..] else {
            panic!("unexpected {out:?}");
        };
        assert_eq!(mv.status, GameStatus::InProgress);
        assert_eq!(referee.move_count(), 1);

        // Null move: rejected and absorbed.
        let out = apply(&mut state, &mut referee, "op=MOVE&code=0&content=7;bob;4242");
        assert!(out.is_empty());
        assert_eq!(referee.move_count(), 1);
    }

    #[test]
    fn move_replay_stops_at_first_rejection() {
        let (mut state, mut referee) = seated_bob();
        apply(&mut state, &mut referee, "op=MOVE&code=0&content=7;bob;1242");
        let out = apply(
            &mut state,
            &mut referee,
            "op=I_MOVES&code=0&content=7;1242/7967/3333/0010",
        );
        let [Notification::MovesRestored(moves)] = &out[..] else {
            panic!("unexpected {out:?}");
        };
        assert_eq!(moves.len(), 2);
        assert_eq!(referee.move_count(), 2);
    }

    #[test]
    fn self_leave_resets_session() {
        let (mut state, mut referee) = seated_bob();
        apply(&mut state, &mut referee, "op=E_END&code=0&content=7;red_win");
        assert_eq!(state.game_status, GameStatus::RedWin);

        let out = apply(&mut state, &mut referee, "op=LEAVE&code=0&content=7;bob&tid=7");
        assert_eq!(out, [Notification::TableClosed]);
        assert!(!state.has_table());
        assert_eq!(state.me.color, Color::Unknown);
        assert_eq!(state.game_status, GameStatus::Unknown);
    }

    #[test]
    fn joins_distinguish_local_role() {
        let (mut state, mut referee) = seated_bob();

        let out = apply(&mut state, &mut referee, "op=E_JOIN&code=0&content=7;ann;1620;Black");
        assert_eq!(
            out,
            [Notification::PlayerJoined {
                pid: "ann".into(),
                rating: "1620".into(),
                color: Color::Black
            }]
        );
        assert_eq!(state.table.black_id, "ann");

        let out = apply(&mut state, &mut referee, "op=E_JOIN&code=0&content=7;bob;1500;None");
        assert_eq!(
            out,
            [
                Notification::LocalRoleChanged(Color::Observer),
                Notification::PlayerJoined {
                    pid: "bob".into(),
                    rating: "1500".into(),
                    color: Color::Observer
                }
            ]
        );
        assert_eq!(state.me.color, Color::Observer);
        assert!(state.table.red_seat_empty());

        let out = apply(&mut state, &mut referee, "op=LEAVE&code=0&content=7;ann");
        assert_eq!(out, [Notification::PlayerLeft { pid: "ann".into() }]);
        assert!(state.table.black_seat_empty());
    }

    #[test]
    fn reset_clears_history_and_status() {
        let (mut state, mut referee) = seated_bob();
        apply(&mut state, &mut referee, "op=MOVE&code=0&content=7;bob;1242");
        apply(&mut state, &mut referee, "op=E_END&code=0&content=7;drawn");
        let out = apply(&mut state, &mut referee, "op=RESET&code=0&content=7");
        assert_eq!(out, [Notification::GameReset]);
        assert_eq!(state.game_status, GameStatus::Unknown);
        assert_eq!(referee.move_count(), 0);
    }

    #[test]
    fn score_updates_seat_and_identity() {
        let (mut state, mut referee) = seated_bob();
        apply(&mut state, &mut referee, "op=E_SCORE&code=0&content=7;bob;1512");
        assert_eq!(state.me.rating, "1512");
        assert_eq!(state.table.red_rating, "1512");
    }

    #[test]
    fn chat_and_invites() {
        let (mut state, mut referee) = seated_bob();

        let out = apply(&mut state, &mut referee, "op=MSG&code=0&content=ann;hello&tid=7");
        let [Notification::Message(msg)] = &out[..] else {
            panic!("unexpected {out:?}");
        };
        assert_eq!(msg.kind, MessageKind::TableChat);
        assert_eq!(msg.table_id, "7");

        let out = apply(&mut state, &mut referee, "op=MSG&code=0&content=ann;psst");
        let [Notification::Message(msg)] = &out[..] else {
            panic!("unexpected {out:?}");
        };
        assert_eq!(msg.kind, MessageKind::PrivateChat);
        assert!(msg.table_id.is_empty());

        assert!(apply(&mut state, &mut referee, "op=INVITE&code=0&content=ann;1620;cid").is_empty());

        let out = apply(&mut state, &mut referee, "op=INVITE&code=0&content=ann;1620;bob");
        let [Notification::Message(msg)] = &out[..] else {
            panic!("unexpected {out:?}");
        };
        assert_eq!(msg.kind, MessageKind::Invite);
        assert_eq!(msg.sender, "ann");
        assert_eq!(msg.table_id, "?");
    }

    #[test]
    fn network_fault_closes_table() {
        let (mut state, mut referee) = seated_bob();
        let out = state.apply_lifecycle(LifecycleCode::IoError, &mut referee);
        assert_eq!(
            out,
            [
                Notification::TableClosed,
                Notification::NetworkFault(LifecycleCode::IoError)
            ]
        );
        assert_eq!(state.auth, AuthState::LoggedOut);
        assert!(!state.has_table());
        assert_eq!(state.me.color, Color::Unknown);
    }

    #[test]
    fn failed_request_is_scoped() {
        let (mut state, mut referee) = seated_bob();
        let out = apply(&mut state, &mut referee, "op=JOIN&code=7&content=12");
        assert_eq!(
            out,
            [Notification::RequestFailed {
                op: "JOIN".into(),
                code: hox_core::protocol::ErrorCode::NotFound
            }]
        );
        assert_eq!(state.auth, AuthState::LoggedIn);
        assert!(state.has_table());
    }
}
