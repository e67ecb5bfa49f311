use crate::connection::{
    ConnectionError, ConnectionEvent, ConnectionFactory, DataChannel, LocalMedia, LocalTrack,
    PeerConnection, RemoteTrack,
};
use crate::negotiation::{Effect, NegotiationEvent, NegotiationState, transition};
use bytes::Bytes;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tandem_core::utils::CHAT_CHANNEL_LABEL;
use tandem_core::{PeerRole, RelayFrame, SdpType, SignalMessage, SignalingState};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, trace, warn};

mod lifecycle_impl;
mod local_description_impl;
mod remote_signal_impl;
mod signal_sink;

pub use signal_sink::SignalSink;

/// A failure the session recovered from but the user may want to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationFault {
    LocalDescription { error: String },
    RemoteDescription { sdp_type: SdpType, error: String },
    Candidate { error: String },
    Connection { error: String },
}

impl fmt::Display for NegotiationFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalDescription { error } => {
                write!(f, "cannot produce local description: {error}")
            }
            Self::RemoteDescription { sdp_type, error } => {
                write!(f, "cannot apply remote {sdp_type}: {error}")
            }
            Self::Candidate { error } => write!(f, "cannot add ICE candidate for peer: {error}"),
            Self::Connection { error } => write!(f, "cannot build connection: {error}"),
        }
    }
}

/// What the session reports to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    RoleAssigned(PeerRole),
    PeerJoined,
    /// The peer left; anything showing its media should be cleared.
    PeerLeft,
    RemoteTrack(RemoteTrack),
    DataChannel { label: String },
    Chat(String),
    Fault(NegotiationFault),
}

#[derive(Clone)]
struct Link {
    generation: u64,
    connection: Rc<dyn PeerConnection>,
    chat: Rc<dyn DataChannel>,
}

enum LinkSlot {
    Ready(Link),
    Rebuilding,
    Closed,
}

struct SessionInner {
    factory: Box<dyn ConnectionFactory>,
    sink: Box<dyn SignalSink>,
    media: RefCell<LocalMedia>,
    state: Cell<NegotiationState>,
    offers_in_flight: Cell<u32>,
    generation: Cell<u64>,
    link: watch::Sender<LinkSlot>,
    left: watch::Sender<bool>,
    connection_tx: mpsc::UnboundedSender<(u64, ConnectionEvent)>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

/// One side of a call: a connection handle plus the negotiation flags
/// guarding it.
///
/// Everything runs on the current thread. [`Session::run`] must be polled
/// inside a [`tokio::task::LocalSet`].
pub struct Session {
    handle: SessionHandle,
    connection_rx: mpsc::UnboundedReceiver<(u64, ConnectionEvent)>,
}

/// Cheap handle onto a running session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Rc<SessionInner>,
}

impl Session {
    /// Build the first connection handle and publish `media` on it.
    pub async fn start<F, S>(
        factory: F,
        sink: S,
        media: LocalMedia,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), ConnectionError>
    where
        F: ConnectionFactory + 'static,
        S: SignalSink + 'static,
    {
        let (connection_tx, connection_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (link, _) = watch::channel(LinkSlot::Rebuilding);
        let (left, _) = watch::channel(false);

        let handle = SessionHandle {
            inner: Rc::new(SessionInner {
                factory: Box::new(factory),
                sink: Box::new(sink),
                media: RefCell::new(media),
                state: Cell::new(NegotiationState::default()),
                offers_in_flight: Cell::new(0),
                generation: Cell::new(0),
                link,
                left,
                connection_tx,
                events_tx,
            }),
        };

        let link = handle.build_link(0).await?;
        handle.inner.link.send_replace(LinkSlot::Ready(link));

        Ok((
            Self {
                handle,
                connection_rx,
            },
            events_rx,
        ))
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Process relay frames and connection events until the relay closes
    /// or [`SessionHandle::leave`] is called, then leave the call.
    ///
    /// Each input is handled on its own local task, spawned in arrival
    /// order, so handlers interleave wherever one of them suspends. Pending
    /// relay frames are taken before pending connection events.
    pub async fn run(mut self, mut relay_rx: mpsc::UnboundedReceiver<RelayFrame>) {
        info!("Session event loop started");
        let mut left = self.handle.inner.left.subscribe();

        loop {
            tokio::select! {
                biased;

                _ = left.wait_for(|left| *left) => {
                    info!("Left the call. Stopping event loop.");
                    break;
                }

                frame = relay_rx.recv() => {
                    match frame {
                        Some(frame) => {
                            let handle = self.handle.clone();
                            tokio::task::spawn_local(async move {
                                handle.handle_relay_frame(frame).await;
                            });
                        }
                        None => {
                            info!("Relay channel closed. Leaving call.");
                            break;
                        }
                    }
                }

                evt = self.connection_rx.recv() => {
                    match evt {
                        Some((generation, event)) => {
                            let handle = self.handle.clone();
                            tokio::task::spawn_local(async move {
                                handle.handle_connection_event(generation, event).await;
                            });
                        }
                        None => {
                            warn!("Connection event channel closed unexpectedly");
                            break;
                        }
                    }
                }
            }
        }

        self.handle.leave().await;
        info!("Session event loop finished");
    }
}

impl SessionHandle {
    pub async fn handle_relay_frame(&self, frame: RelayFrame) {
        if self.has_left() {
            debug!("Ignoring {:?} after leaving the call", frame);
            return;
        }

        match frame {
            RelayFrame::Connect => {
                info!("Connected to signaling relay");
                self.step(NegotiationEvent::RelayConnected);
                self.notify(SessionEvent::RoleAssigned(self.role()));
            }

            RelayFrame::ConnectedPeer => {
                info!("Heard connected peer event");
                self.step(NegotiationEvent::PeerJoined);
                self.notify(SessionEvent::PeerJoined);
                self.notify(SessionEvent::RoleAssigned(self.role()));
            }

            RelayFrame::DisconnectedPeer => {
                info!("Heard disconnected peer event");
                self.notify(SessionEvent::PeerLeft);
                self.rebuild().await;
            }

            RelayFrame::Signal(signal) => self.process_signal(signal).await,
        }
    }

    pub async fn handle_connection_event(&self, generation: u64, event: ConnectionEvent) {
        if !self.is_current(generation) {
            trace!(generation, "Dropping event from a retired connection");
            return;
        }

        match event {
            ConnectionEvent::NegotiationNeeded => self.on_negotiation_needed(generation).await,

            ConnectionEvent::IceCandidate(candidate) => {
                self.inner
                    .sink
                    .send_signal(SignalMessage::Candidate(candidate))
                    .await;
            }

            ConnectionEvent::Track(track) => {
                info!("Receiving {:?} track '{}' from peer", track.kind, track.id);
                self.notify(SessionEvent::RemoteTrack(track));
            }

            ConnectionEvent::DataChannel { label } => {
                info!("Heard channel '{}'", label);
                self.notify(SessionEvent::DataChannel { label });
            }

            ConnectionEvent::ChannelMessage { label, data } => {
                if label == CHAT_CHANNEL_LABEL {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    self.notify(SessionEvent::Chat(text));
                } else {
                    debug!("Ignoring {} bytes on channel '{}'", data.len(), label);
                }
            }
        }
    }

    /// Send a chat line over the negotiated chat channel.
    pub async fn send_chat(&self, text: &str) -> Result<(), ConnectionError> {
        let link = self.current_link().await.ok_or(ConnectionError::Closed)?;
        link.chat
            .send(Bytes::copy_from_slice(text.as_bytes()))
            .await
    }

    /// Publish another local track. It is also re-published after every
    /// rebuild.
    pub async fn add_track(&self, track: LocalTrack) -> Result<(), ConnectionError> {
        self.inner.media.borrow_mut().tracks.push(track.clone());
        let link = self.current_link().await.ok_or(ConnectionError::Closed)?;
        link.connection.add_track(&track).await
    }

    pub fn role(&self) -> PeerRole {
        self.inner.state.get().role
    }

    pub fn signaling_state(&self) -> SignalingState {
        match &*self.inner.link.borrow() {
            LinkSlot::Ready(link) => link.connection.signaling_state(),
            LinkSlot::Rebuilding => SignalingState::Stable,
            LinkSlot::Closed => SignalingState::Closed,
        }
    }

    pub fn negotiation_state(&self) -> NegotiationState {
        let mut state = self.inner.state.get();
        state.signaling = self.signaling_state();
        state
    }

    /// Whether [`SessionHandle::leave`] already ran.
    pub fn has_left(&self) -> bool {
        *self.inner.left.borrow()
    }

    /// Generation of the handle currently in use; bumps on every rebuild.
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.get() == generation
    }

    /// The installed link, waiting out a rebuild in progress.
    async fn current_link(&self) -> Option<Link> {
        let mut rx = self.inner.link.subscribe();
        let slot = rx
            .wait_for(|slot| !matches!(slot, LinkSlot::Rebuilding))
            .await
            .ok()?;
        let link = match &*slot {
            LinkSlot::Ready(link) => Some(link.clone()),
            _ => None,
        };
        link
    }

    fn step(&self, event: NegotiationEvent) -> Option<Effect> {
        let (next, effect) = transition(self.negotiation_state(), event);
        self.inner.state.set(next);
        debug!(
            ?event,
            ?effect,
            role = %next.role,
            phase = %next.phase(),
            "Negotiation step"
        );
        effect
    }

    fn notify(&self, event: SessionEvent) {
        let _ = self.inner.events_tx.send(event);
    }

    fn report(&self, fault: NegotiationFault) {
        error!("{}", fault);
        self.notify(SessionEvent::Fault(fault));
    }
}
