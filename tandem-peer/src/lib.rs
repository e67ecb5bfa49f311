//! Perfect-negotiation signaling for two-party calls.
//!
//! A [`Session`] owns one peer connection and the negotiation flags that
//! guard it. Relay frames and connection events are fed through a single
//! cooperative loop; the collision policy lives in [`negotiation::transition`].

pub mod connection;
pub mod negotiation;
pub mod relay;
pub mod session;

pub use connection::{
    ConnectionConfig, ConnectionError, ConnectionEvent, ConnectionEvents, ConnectionFactory,
    DataChannel, DataChannelSpec, LocalMedia, LocalTrack, MediaKind, PeerConnection,
    RemoteTrack, RtcConnection, RtcConnectionFactory,
};
pub use negotiation::{Effect, NegotiationEvent, NegotiationFlags, NegotiationState, Phase};
pub use relay::{RelayClient, RelayError, RelaySink};
pub use session::{NegotiationFault, Session, SessionEvent, SessionHandle, SignalSink};
