//! The session controller: protocol semantics above the frame level.
//!
//! Owns a [`TransportHandle`] and the [`SessionState`], providing:
//!
//! - Dispatch of inbound frames and lifecycle codes, with the resulting
//!   [`Notification`]s fanned out to registered listeners.
//! - Player actions that either go out immediately or, while not logged
//!   in, wait in a FIFO of [`PendingRequest`]s and trigger a login.
//!
//! Frontends only need to:
//! 1. Build a controller with [`SessionController::new`].
//! 2. Call [`SessionController::recv`] (in a `select!`) or
//!    [`SessionController::try_recv`] to process transport events.
//! 3. Call the action methods in response to user input.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use hox_core::moves::MoveInfo;
use hox_core::protocol::{Color, ServerEvent};
use hox_core::referee::{MoveHistory, Referee};
use hox_core::request::{ChatTarget, Request};
use hox_core::table::TimeSpec;

use crate::config::{ClientConfig, Credentials};
use crate::error::SessionError;
use crate::notification::{Notification, SessionListener};
use crate::session::{AuthState, SessionState};
use crate::transport::{LifecycleCode, Transport, TransportEvent, TransportHandle};

/// A request deferred until login completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest(Request);

impl PendingRequest {
    pub fn operation(&self) -> &'static str {
        self.0.op()
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        self.0.params()
    }

    pub fn request(&self) -> &Request {
        &self.0
    }
}

/// Outcome of processing a single transport event.
#[derive(Debug)]
pub enum PollResult {
    /// An event was applied; these notifications were emitted.
    Updated(Vec<Notification>),
    /// The transport task is gone.
    Disconnected,
    /// No event was available (channel empty).
    Empty,
}

pub struct SessionController {
    transport: TransportHandle,
    incoming: mpsc::UnboundedReceiver<TransportEvent>,
    credentials: Credentials,
    state: SessionState,
    pending: VecDeque<PendingRequest>,
    logout_requested: bool,
    /// The pending disconnect follows a refused login.
    login_refused: bool,
    referee: Box<dyn Referee>,
    listeners: Vec<Box<dyn SessionListener>>,
}

impl SessionController {
    /// Spawn a transport for `config` and wrap it. Must be called inside a
    /// tokio runtime.
    pub fn new(config: ClientConfig, credentials: Credentials) -> Self {
        let (transport, incoming) = Transport::spawn(config);
        Self::from_parts(transport, incoming, credentials)
    }

    /// Build a controller over an existing transport handle and event
    /// stream.
    pub fn from_parts(
        transport: TransportHandle,
        incoming: mpsc::UnboundedReceiver<TransportEvent>,
        credentials: Credentials,
    ) -> Self {
        Self {
            transport,
            incoming,
            state: SessionState::new(credentials.pid.clone()),
            credentials,
            pending: VecDeque::new(),
            logout_requested: false,
            login_refused: false,
            referee: Box::new(MoveHistory::new()),
            listeners: Vec::new(),
        }
    }

    /// Replace the default move oracle.
    pub fn with_referee(mut self, referee: Box<dyn Referee>) -> Self {
        self.referee = referee;
        self
    }

    pub fn add_listener(&mut self, listener: Box<dyn SessionListener>) {
        self.listeners.push(listener);
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingRequest> {
        self.pending.iter()
    }

    pub fn pid(&self) -> &str {
        &self.credentials.pid
    }

    // ------------------------------------------------------------------
    // Event intake
    // ------------------------------------------------------------------

    /// Try to receive and process one transport event (non-blocking).
    pub fn try_recv(&mut self) -> PollResult {
        match self.incoming.try_recv() {
            Ok(event) => PollResult::Updated(self.handle_transport_event(event)),
            Err(mpsc::error::TryRecvError::Empty) => PollResult::Empty,
            Err(mpsc::error::TryRecvError::Disconnected) => PollResult::Disconnected,
        }
    }

    /// Await the next transport event. Cancel-safe, for `tokio::select!`.
    pub async fn recv(&mut self) -> PollResult {
        match self.incoming.recv().await {
            Some(event) => PollResult::Updated(self.handle_transport_event(event)),
            None => PollResult::Disconnected,
        }
    }

    /// Apply one transport event and notify listeners.
    pub fn handle_transport_event(&mut self, event: TransportEvent) -> Vec<Notification> {
        let notifications = match event {
            TransportEvent::Frame(frame) => self.handle_frame(&frame),
            TransportEvent::Lifecycle(code) => self.handle_lifecycle(code),
        };
        for notification in &notifications {
            for listener in &mut self.listeners {
                listener.notify(notification);
            }
        }
        notifications
    }

    fn handle_frame(&mut self, frame: &str) -> Vec<Notification> {
        let event = match ServerEvent::parse(frame) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, %frame, "malformed event dropped");
                return Vec::new();
            }
        };

        let notifications = self.state.apply(event, self.referee.as_mut());
        for notification in &notifications {
            match notification {
                Notification::LoginResult { ok: true, .. } => {
                    info!(pid = %self.credentials.pid, "logged in");
                    self.replay_pending();
                }
                Notification::LoginResult { ok: false, .. } => {
                    // A refused login always tears the connection down.
                    // The backlog stays queued for the next login.
                    self.login_refused = true;
                    self.disconnect_quietly();
                }
                _ => {}
            }
        }
        notifications
    }

    fn handle_lifecycle(&mut self, code: LifecycleCode) -> Vec<Notification> {
        let had_table = self.state.has_table();
        let mut notifications = self.state.apply_lifecycle(code, self.referee.as_mut());

        match code {
            LifecycleCode::Connected => {
                info!("connected, awaiting login");
            }
            LifecycleCode::Disconnected => {
                if self.logout_requested {
                    self.logout_requested = false;
                    self.pending.clear();
                    notifications.push(Notification::LoggedOut);
                } else if self.login_refused {
                    self.login_refused = false;
                    debug!(pending = self.pending.len(), "login refused, not reconnecting");
                } else if !self.pending.is_empty() {
                    info!(pending = self.pending.len(), "reconnecting to replay pending requests");
                    self.connect_quietly();
                }
            }
            LifecycleCode::IoError if had_table => {
                info!("connection lost at a table, reconnecting");
                self.connect_quietly();
            }
            _ => {}
        }
        notifications
    }

    /// Send the oldest pending request, if any.
    fn replay_pending(&mut self) {
        if let Some(PendingRequest(request)) = self.pending.pop_front() {
            debug!(op = request.op(), remaining = self.pending.len(), "replaying pending request");
            if let Err(e) = self.transport.send(request) {
                warn!(error = %e, "failed to replay pending request");
            }
        }
    }

    fn connect_quietly(&mut self) {
        if let Err(e) = self.connect() {
            warn!(error = %e, "reconnect failed");
        }
    }

    fn disconnect_quietly(&mut self) {
        if let Err(e) = self.transport.disconnect() {
            warn!(error = %e, "disconnect failed");
        }
    }

    // ------------------------------------------------------------------
    // Session actions
    // ------------------------------------------------------------------

    /// Open the connection and log in. Does nothing while a login is
    /// already under way or complete.
    pub fn connect(&mut self) -> Result<(), SessionError> {
        if self.state.auth != AuthState::LoggedOut {
            return Ok(());
        }
        self.state.auth = AuthState::AwaitingLogin;
        self.logout_requested = false;
        self.login_refused = false;
        self.transport.connect(self.credentials.clone())?;
        Ok(())
    }

    /// Log out. The transport sends `LOGOUT` and then closes.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.logout_requested = true;
        self.transport.disconnect()?;
        Ok(())
    }

    pub fn request_table_list(&mut self) -> Result<(), SessionError> {
        self.dispatch(Request::List)
    }

    pub fn request_player_info(&mut self, oid: &str) -> Result<(), SessionError> {
        self.dispatch(Request::PlayerInfo {
            oid: oid.to_string(),
        })
    }

    /// Open a new table, leaving the current one first.
    ///
    /// Refused while seated in a game that has not ended.
    pub fn open_new_table(&mut self, itimes: Option<TimeSpec>) -> Result<(), SessionError> {
        if self.state.me.color.is_seated() && !self.state.game_status.is_over() {
            return Err(SessionError::CurrentlyPlaying);
        }
        if self.logged_in() && self.state.has_table() {
            self.send(Request::Leave {
                tid: self.state.table.table_id.clone(),
            })?;
        }
        self.dispatch(Request::New {
            itimes: itimes.unwrap_or(TimeSpec::DEFAULT_INITIAL),
        })
    }

    /// Move to table `tid` as an observer. Ignored when already there.
    pub fn select_table(&mut self, tid: &str) -> Result<(), SessionError> {
        if self.state.table.has_id(tid) {
            debug!(%tid, "already at table");
            return Ok(());
        }
        if self.logged_in() && self.state.has_table() {
            self.send(Request::Leave {
                tid: self.state.table.table_id.clone(),
            })?;
        }
        self.dispatch(Request::Join {
            tid: tid.to_string(),
            color: Color::Observer,
        })
    }

    /// React to the player clicking a seat (or the observer area).
    ///
    /// Clicking your own seat stands you up. Clicking an empty seat takes
    /// it; going straight from red to black (or back) stands up first.
    pub fn change_role(&mut self, clicked: Color) -> Result<(), SessionError> {
        let tid = self.current_table()?.to_string();
        let current = self.state.me.color;

        let seat_empty = |color: Color| match color {
            Color::Red => self.state.table.red_seat_empty(),
            Color::Black => self.state.table.black_seat_empty(),
            _ => false,
        };

        let requests: Vec<Color> = match (current, clicked) {
            (_, Color::Unknown) | (Color::Unknown, _) => {
                return Err(SessionError::InvalidRole(clicked));
            }
            (Color::Observer, Color::Observer) => Vec::new(),
            (current, clicked) if current == clicked => vec![Color::Observer],
            (_, Color::Observer) => vec![Color::Observer],
            (Color::Observer, target) => {
                if !seat_empty(target) {
                    return Err(SessionError::SeatTaken(target));
                }
                vec![target]
            }
            (_, target) => {
                if !seat_empty(target) {
                    return Err(SessionError::SeatTaken(target));
                }
                vec![Color::Observer, target]
            }
        };

        for color in requests {
            self.send(Request::Join {
                tid: tid.clone(),
                color,
            })?;
        }
        Ok(())
    }

    pub fn leave_table(&mut self) -> Result<(), SessionError> {
        let tid = self.current_table()?.to_string();
        self.send(Request::Leave { tid })
    }

    pub fn send_move(&mut self, mv: MoveInfo) -> Result<(), SessionError> {
        let tid = self.seated_table()?;
        self.send(Request::Move { tid, mv })
    }

    pub fn offer_draw(&mut self) -> Result<(), SessionError> {
        let tid = self.seated_table()?;
        self.send(Request::Draw { tid })
    }

    pub fn resign(&mut self) -> Result<(), SessionError> {
        let tid = self.seated_table()?;
        self.send(Request::Resign { tid })
    }

    pub fn reset_table(&mut self) -> Result<(), SessionError> {
        let tid = self.current_table()?.to_string();
        self.send(Request::Reset { tid })
    }

    pub fn send_table_message(&mut self, msg: &str) -> Result<(), SessionError> {
        let tid = self.current_table()?.to_string();
        self.send(Request::Msg {
            target: ChatTarget::Table(tid),
            msg: msg.to_string(),
        })
    }

    pub fn send_private_message(&mut self, oid: &str, msg: &str) -> Result<(), SessionError> {
        self.dispatch(Request::Msg {
            target: ChatTarget::Player(oid.to_string()),
            msg: msg.to_string(),
        })
    }

    /// Invite `oid` to the current table.
    pub fn invite(&mut self, oid: &str) -> Result<(), SessionError> {
        let tid = self.current_table()?.to_string();
        self.send(Request::Invite {
            oid: oid.to_string(),
            tid,
        })
    }

    // -- private -----------------------------------------------------------

    fn logged_in(&self) -> bool {
        self.state.auth == AuthState::LoggedIn
    }

    fn current_table(&self) -> Result<&str, SessionError> {
        if self.state.has_table() {
            Ok(&self.state.table.table_id)
        } else {
            Err(SessionError::NoTable)
        }
    }

    fn seated_table(&self) -> Result<String, SessionError> {
        let tid = self.current_table()?.to_string();
        if !self.state.me.color.is_seated() {
            return Err(SessionError::NotSeated);
        }
        Ok(tid)
    }

    fn send(&self, request: Request) -> Result<(), SessionError> {
        self.transport.send(request)?;
        Ok(())
    }

    /// Send now if logged in; otherwise queue and start logging in.
    fn dispatch(&mut self, request: Request) -> Result<(), SessionError> {
        if self.logged_in() {
            return self.send(request);
        }
        debug!(op = request.op(), "not logged in, request queued");
        self.pending.push_back(PendingRequest(request));
        self.connect()
    }
}
