//! Room relay for tandem calls.
//!
//! Every room is an actor fed through a command channel. WebSocket
//! connections join a room by path (`/ws/{room}`), and everything a member
//! sends is fanned out to the other members.

mod room;
mod server;
mod signaling;

pub use room::*;
pub use server::*;
pub use signaling::*;
