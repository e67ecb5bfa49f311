use crate::room::{Room, RoomCommand};
use crate::signaling::RelayOutput;
use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::RoomId;
use tokio::sync::mpsc;
use tracing::info;

/// Capacity of each room's command channel.
pub const ROOM_COMMAND_CAPACITY: usize = 100;

struct RoomEntry {
    tx: mpsc::Sender<RoomCommand>,
    sockets: usize,
}

/// Spawns one actor per room and retires it once its last socket is gone.
///
/// The actor shuts down by itself after the manager forgets it and every
/// socket dropped its sender.
#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<DashMap<RoomId, RoomEntry>>,
    output: Arc<dyn RelayOutput>,
}

impl RoomManager {
    pub fn new(output: Arc<dyn RelayOutput>) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            output,
        }
    }

    /// Claim a place in the room for one socket and return the sender of the
    /// room's actor, spawning the actor on first use. Pair every call with
    /// [`RoomManager::leave_room`].
    pub fn join_room(&self, room_id: &RoomId) -> mpsc::Sender<RoomCommand> {
        let mut entry = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!("Creating new room: {}", room_id);
            let (tx, rx) = mpsc::channel(ROOM_COMMAND_CAPACITY);
            let room = Room::new(room_id.clone(), rx, self.output.clone());
            tokio::spawn(room.run());
            RoomEntry { tx, sockets: 0 }
        });
        entry.sockets += 1;
        entry.tx.clone()
    }

    /// Release a socket's claim. The last one out retires the room.
    pub fn leave_room(&self, room_id: &RoomId) {
        let retired = self.rooms.remove_if_mut(room_id, |_, entry| {
            entry.sockets = entry.sockets.saturating_sub(1);
            entry.sockets == 0
        });
        if retired.is_some() {
            info!("Room {} is empty, retiring it", room_id);
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
