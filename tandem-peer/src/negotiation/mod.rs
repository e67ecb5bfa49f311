//! The perfect-negotiation collision policy as a pure transition function.
//!
//! The session feeds every relevant occurrence through [`transition`] and
//! carries out the returned [`Effect`] against the connection and relay. No
//! I/O happens here.

mod state;
mod transition;

pub use state::{NegotiationFlags, NegotiationState, Phase};
pub use transition::{Effect, NegotiationEvent, transition};
