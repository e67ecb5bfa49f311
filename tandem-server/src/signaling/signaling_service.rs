use crate::signaling::RelayOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::{PeerId, RelayFrame};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Outbound half of every open socket, keyed by peer.
#[derive(Clone, Default)]
pub struct SignalingService {
    peers: Arc<DashMap<PeerId, mpsc::UnboundedSender<Message>>>,
}

impl SignalingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) {
        self.peers.insert(peer_id, tx);
    }

    pub fn remove_peer(&self, peer_id: &PeerId) {
        self.peers.remove(peer_id);
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn send_frame(&self, peer_id: PeerId, frame: &RelayFrame) {
        let Some(peer) = self.peers.get(&peer_id) else {
            warn!("Attempted to send frame to disconnected peer {}", peer_id);
            return;
        };

        match serde_json::to_string(frame) {
            Ok(json) => {
                if let Err(e) = peer.send(Message::Text(json.into())) {
                    error!("Failed to send WS message to {}: {:?}", peer_id, e);
                }
            }
            Err(e) => error!("Failed to serialize relay frame: {}", e),
        }
    }
}

#[async_trait]
impl RelayOutput for SignalingService {
    async fn deliver(&self, peer_id: PeerId, frame: RelayFrame) {
        self.send_frame(peer_id, &frame);
    }
}
