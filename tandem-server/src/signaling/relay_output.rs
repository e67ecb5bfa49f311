use async_trait::async_trait;
use tandem_core::{PeerId, RelayFrame};

/// How a room reaches its members. The WebSocket layer implements it; tests
/// substitute a recorder.
#[async_trait]
pub trait RelayOutput: Send + Sync {
    async fn deliver(&self, peer_id: PeerId, frame: RelayFrame);
}
