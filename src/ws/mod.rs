//! RealtimeChannel: WebSocket transport and wire protocol

pub mod handler;
pub mod protocol;

pub use protocol::{ClientMsg, ServerMsg};
