//! Socket-free protocol layer for the HOX xiangqi game server: framing,
//! inbound event decoding, request rendering, and the table/move types they
//! share.

pub mod frame;
pub mod moves;
pub mod protocol;
pub mod referee;
pub mod request;
pub mod table;

pub use protocol::DecodeError;
