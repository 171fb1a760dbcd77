use thiserror::Error;

use hox_core::protocol::Color;

use crate::transport::TransportError;

/// A session action that was refused locally, before anything was sent.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not at a table")]
    NoTable,

    #[error("only a seated player can do that")]
    NotSeated,

    #[error("a game is in progress")]
    CurrentlyPlaying,

    #[error("cannot request role {0}")]
    InvalidRole(Color),

    #[error("the {0} seat is taken")]
    SeatTaken(Color),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
