//! Networked session layer for the HOX xiangqi client.
//!
//! [`Transport`] owns the single TCP connection in a background task;
//! [`SessionController`] turns its frames into session state and
//! [`Notification`]s.

pub mod config;
pub mod controller;
pub mod error;
pub mod notification;
mod reactor;
pub mod session;
pub mod transport;

pub use config::{ClientConfig, Credentials};
pub use controller::{PendingRequest, PollResult, SessionController};
pub use error::SessionError;
pub use notification::{MessageInfo, MessageKind, Notification, SessionListener};
pub use session::{AuthState, MyIdentity, SessionState};
pub use transport::{
    ConnectionState, LifecycleCode, Transport, TransportCommand, TransportError, TransportEvent,
    TransportHandle,
};
