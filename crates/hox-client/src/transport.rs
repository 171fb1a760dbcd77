//! Message-passing front of the single server connection.
//!
//! The socket itself lives inside a background task (see
//! [`reactor`](crate::reactor)). Callers talk to it only through a
//! [`TransportHandle`], which never blocks, and hear back through a channel
//! of [`TransportEvent`]s: raw frames in arrival order plus
//! [`LifecycleCode`]s describing the connection.

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use hox_core::request::Request;

use crate::config::{ClientConfig, Credentials};
use crate::reactor::Reactor;

/// Errors returned by [`TransportHandle`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The reactor task has exited, so nothing can be sent any more.
    #[error("transport task has stopped")]
    Stopped,
}

/// Connection state, owned by the reactor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    None,
    Connecting,
    Connected,
    /// `LOGIN` has been written on this connection.
    Authenticated,
}

/// Connection-level signal from the reactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleCode {
    Connected,
    /// The host name did not resolve. Not retried.
    UnresolvedAddress,
    /// The connect attempt outlived `connect_timeout`.
    ConnectTimeout,
    IoError,
    /// A requested disconnect completed.
    Disconnected,
    /// The server closed the connection.
    Closed,
}

impl LifecycleCode {
    /// Whether this code means the connection was lost rather than
    /// opened or closed on request.
    pub fn is_fault(self) -> bool {
        !matches!(self, Self::Connected | Self::Disconnected)
    }
}

/// Instructions accepted by the reactor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Open the connection (if none is open) and log in with these
    /// credentials once it is up.
    Connect(Credentials),
    /// Log out if logged in, then close. Observed on the next poll cycle.
    Disconnect,
    /// Write one request line. Dropped when no connection is open.
    Send(Request),
}

/// What the reactor reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One complete event body.
    Frame(String),
    Lifecycle(LifecycleCode),
}

/// Cloneable sending side of the reactor's command queue.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    commands: mpsc::UnboundedSender<TransportCommand>,
}

impl TransportHandle {
    /// Wrap an existing command queue. Whatever drains the receiving end
    /// plays the part of the reactor.
    pub fn new(commands: mpsc::UnboundedSender<TransportCommand>) -> Self {
        Self { commands }
    }

    pub fn connect(&self, credentials: Credentials) -> Result<(), TransportError> {
        self.command(TransportCommand::Connect(credentials))
    }

    pub fn disconnect(&self) -> Result<(), TransportError> {
        self.command(TransportCommand::Disconnect)
    }

    pub fn send(&self, request: Request) -> Result<(), TransportError> {
        self.command(TransportCommand::Send(request))
    }

    fn command(&self, command: TransportCommand) -> Result<(), TransportError> {
        self.commands
            .send(command)
            .map_err(|_| TransportError::Stopped)
    }
}

/// Entry point for starting the reactor.
pub struct Transport;

impl Transport {
    /// Spawn the reactor task on the current tokio runtime.
    ///
    /// The task runs until every [`TransportHandle`] clone is dropped.
    pub fn spawn(
        config: ClientConfig,
    ) -> (TransportHandle, mpsc::UnboundedReceiver<TransportEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let reactor = Reactor::new(config, cmd_rx, event_tx);
        tokio::spawn(reactor.run());

        (TransportHandle::new(cmd_tx), event_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_reports_stopped_reactor() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = TransportHandle::new(tx);
        assert!(handle.send(Request::List).is_ok());
        drop(rx);
        assert!(matches!(handle.disconnect(), Err(TransportError::Stopped)));
    }

    #[test]
    fn fault_codes() {
        assert!(LifecycleCode::IoError.is_fault());
        assert!(LifecycleCode::Closed.is_fault());
        assert!(LifecycleCode::ConnectTimeout.is_fault());
        assert!(!LifecycleCode::Connected.is_fault());
        assert!(!LifecycleCode::Disconnected.is_fault());
    }
}
