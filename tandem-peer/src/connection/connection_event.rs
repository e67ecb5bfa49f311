use crate::connection::RemoteTrack;
use bytes::Bytes;
use tandem_core::IceCandidate;
use tokio::sync::mpsc;

/// What a connection handle reports back to its session.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// Local configuration changed and a new offer is required.
    NegotiationNeeded,

    /// A local candidate was gathered and should go to the peer.
    IceCandidate(IceCandidate),

    /// The peer started sending a track.
    Track(RemoteTrack),

    /// The peer opened an in-band data channel.
    DataChannel { label: String },

    /// A message arrived on one of our data channels.
    ChannelMessage { label: String, data: Bytes },
}

/// Emitter handed to a connection handle at construction.
///
/// Every event is stamped with the generation of the handle that produced
/// it, so the session can drop events from handles it already replaced.
#[derive(Debug, Clone)]
pub struct ConnectionEvents {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, ConnectionEvent)>,
}

impl ConnectionEvents {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, ConnectionEvent)>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn emit(&self, event: ConnectionEvent) {
        // The session is gone once the receiver drops; nothing left to tell.
        let _ = self.tx.send((self.generation, event));
    }
}
