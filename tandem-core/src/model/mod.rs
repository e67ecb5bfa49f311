mod peer;
mod role;
mod room;
mod signaling;
mod state;

pub use peer::PeerId;
pub use role::PeerRole;
pub use room::{RoomId, RoomIdError};
pub use signaling::{
    IceCandidate, IceServerConfig, RelayFrame, SdpType, SessionDescription, SignalMessage,
    SignalMessageError,
};
pub use state::SignalingState;
