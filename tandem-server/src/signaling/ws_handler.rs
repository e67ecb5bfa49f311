use crate::room::RoomCommand;
use crate::server::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tandem_core::{PeerId, RelayFrame, RoomId};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn ws_handler(
    Path(room): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let room_id = match room.parse::<RoomId>() {
        Ok(room_id) => room_id,
        Err(e) => {
            warn!("Refusing socket: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, room_id, state))
        .into_response()
}

async fn handle_socket(socket: WebSocket, room_id: RoomId, state: AppState) {
    let peer_id = PeerId::new();
    info!("New WebSocket connection {} for room {}", peer_id, room_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.signaling.add_peer(peer_id, tx);

    let room_tx = state.rooms.join_room(&room_id);
    if let Err(e) = room_tx.send(RoomCommand::Join { peer_id }).await {
        error!("Room {} died: {}", room_id, e);
        state.rooms.leave_room(&room_id);
        state.signaling.remove_peer(&peer_id);
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let room_tx = room_tx.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<RelayFrame>(&text) {
                        Ok(RelayFrame::Signal(signal)) => {
                            let cmd = RoomCommand::Signal { peer_id, signal };
                            if let Err(e) = room_tx.send(cmd).await {
                                error!("Room died: {}", e);
                                break;
                            }
                        }
                        Ok(other) => warn!("Ignoring {:?} frame from {}", other, peer_id),
                        Err(e) => warn!("Invalid relay frame from {}: {}", peer_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    let _ = room_tx.send(RoomCommand::Leave { peer_id }).await;
    state.rooms.leave_room(&room_id);
    state.signaling.remove_peer(&peer_id);
    info!("WebSocket disconnected: {}", peer_id);
}
