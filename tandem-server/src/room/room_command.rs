use tandem_core::{PeerId, SignalMessage};

/// Commands the signaling layer feeds into a room.
#[derive(Debug)]
pub enum RoomCommand {
    /// A socket opened on the room.
    Join { peer_id: PeerId },

    /// A member sent a signal for the others.
    Signal { peer_id: PeerId, signal: SignalMessage },

    /// The member's socket closed.
    Leave { peer_id: PeerId },
}
