//! Client side of the room relay: one websocket per session.

mod relay_client;

pub use relay_client::{RelayClient, RelayError, RelaySink};
