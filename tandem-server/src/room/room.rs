use crate::room::room_command::RoomCommand;
use crate::signaling::RelayOutput;
use std::sync::Arc;
use tandem_core::{PeerId, RelayFrame, RoomId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct Room {
    room_id: RoomId,
    members: Vec<PeerId>,
    command_rx: mpsc::Receiver<RoomCommand>,
    output: Arc<dyn RelayOutput>,
}

impl Room {
    pub fn new(
        room_id: RoomId,
        command_rx: mpsc::Receiver<RoomCommand>,
        output: Arc<dyn RelayOutput>,
    ) -> Self {
        Self {
            room_id,
            members: Vec::new(),
            command_rx,
            output,
        }
    }

    pub async fn run(mut self) {
        info!("Room {} event loop started", self.room_id);

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;
        }

        info!("Command channel closed. Room {} shut down.", self.room_id);
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { peer_id } => {
                if self.members.contains(&peer_id) {
                    warn!("Peer {} already in room {}", peer_id, self.room_id);
                    return;
                }

                info!(
                    "Peer {} joined room {} ({} already present)",
                    peer_id,
                    self.room_id,
                    self.members.len()
                );

                self.output.deliver(peer_id, RelayFrame::Connect).await;
                self.broadcast_from(&peer_id, RelayFrame::ConnectedPeer).await;
                self.members.push(peer_id);
            }

            RoomCommand::Signal { peer_id, signal } => {
                if !self.members.contains(&peer_id) {
                    warn!("Dropping signal from non-member {}", peer_id);
                    return;
                }
                debug!("Relaying signal from {} in room {}", peer_id, self.room_id);
                self.broadcast_from(&peer_id, RelayFrame::Signal(signal)).await;
            }

            RoomCommand::Leave { peer_id } => {
                let before = self.members.len();
                self.members.retain(|member| *member != peer_id);
                if self.members.len() == before {
                    return;
                }

                info!("Peer {} left room {}", peer_id, self.room_id);
                self.broadcast_from(&peer_id, RelayFrame::DisconnectedPeer)
                    .await;
            }
        }
    }

    /// Deliver `frame` to every member except `sender`, in join order.
    async fn broadcast_from(&self, sender: &PeerId, frame: RelayFrame) {
        for member in self.members.iter().filter(|member| *member != sender) {
            self.output.deliver(*member, frame.clone()).await;
        }
    }
}
