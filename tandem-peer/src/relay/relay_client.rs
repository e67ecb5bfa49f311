use crate::session::SignalSink;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tandem_core::{RelayFrame, RoomId, SignalMessage};
use thiserror::Error;
use std::sync::Arc;
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("cannot reach relay: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Joins rooms on one relay server.
#[derive(Debug, Clone)]
pub struct RelayClient {
    server: String,
}

impl RelayClient {
    /// `server` is either a bare `host:port` or a `ws://`/`wss://` base URL.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
        }
    }

    pub fn room_url(&self, room: &RoomId) -> String {
        let base = self.server.trim_end_matches('/');
        if base.starts_with("ws://") || base.starts_with("wss://") {
            format!("{base}/ws/{room}")
        } else {
            format!("ws://{base}/ws/{room}")
        }
    }

    /// Open the room's socket. Frames from the relay arrive on the returned
    /// receiver, which closes when the socket does.
    pub async fn join(
        &self,
        room: &RoomId,
    ) -> Result<(RelaySink, mpsc::UnboundedReceiver<RelayFrame>), RelayError> {
        let url = self.room_url(room);
        info!("Connecting to relay: {}", url);

        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<RelayFrame>();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel::<RelayFrame>();
        let shutdown = Arc::new(Notify::new());

        let writer_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                // Queued frames still go out before a requested shutdown.
                let frame = tokio::select! {
                    biased;
                    frame = outgoing_rx.recv() => frame,
                    _ = writer_shutdown.notified() => None,
                };
                let Some(frame) = frame else { break };

                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize relay frame: {}", e);
                        continue;
                    }
                };
                if write.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            debug!("Closing relay socket");
            let _ = write.close().await;
        });

        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<RelayFrame>(text.as_str()) {
                            Ok(frame) => {
                                if incoming_tx.send(frame).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Dropping malformed relay frame: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        error!("Relay socket error: {}", e);
                        break;
                    }
                }
            }
            debug!("Relay socket closed");
        });

        let sink = RelaySink {
            tx: outgoing_tx,
            shutdown,
        };
        Ok((sink, incoming_rx))
    }
}

/// Sends signals to the other room member through the relay socket.
#[derive(Debug, Clone)]
pub struct RelaySink {
    tx: mpsc::UnboundedSender<RelayFrame>,
    shutdown: Arc<Notify>,
}

impl RelaySink {
    pub fn new(tx: mpsc::UnboundedSender<RelayFrame>) -> Self {
        Self {
            tx,
            shutdown: Arc::new(Notify::new()),
        }
    }
}

#[async_trait(?Send)]
impl SignalSink for RelaySink {
    async fn send_signal(&self, signal: SignalMessage) {
        if self.tx.send(RelayFrame::Signal(signal)).is_err() {
            warn!("Relay socket closed; dropping outbound signal");
        }
    }

    async fn close(&self) {
        self.shutdown.notify_one();
    }
}
