use async_trait::async_trait;
use bytes::Bytes;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tandem_core::{IceCandidate, SdpType, SessionDescription, SignalingState};
use tandem_peer::{
    ConnectionError, ConnectionEvent, ConnectionEvents, ConnectionFactory, DataChannel,
    DataChannelSpec, LocalTrack, MediaKind, PeerConnection, RemoteTrack,
};
use tokio::sync::{Mutex, watch};

/// In-memory connection handle that speaks a toy SDP dialect.
///
/// Description operations are serialized like a real operations chain, and
/// `set_local_description` can be parked on a gate so tests control exactly
/// when an offer commits. ICE credentials belong to the handle, so every
/// description it produces carries the same `ice-ufrag`.
pub struct FakeConnection {
    name: String,
    events: ConnectionEvents,
    state: Cell<SignalingState>,
    ops: Mutex<()>,
    gate: watch::Sender<bool>,
    single_step: Cell<bool>,
    closed: Cell<bool>,
    version: Cell<u32>,
    negotiation_pending: Cell<bool>,
    local_tracks: RefCell<Vec<LocalTrack>>,
    channels: RefCell<Vec<Rc<FakeDataChannel>>>,
    local: RefCell<Option<SessionDescription>>,
    remote: RefCell<Option<SessionDescription>>,
    remote_ufrag: RefCell<Option<String>>,
    remote_tracks: RefCell<Vec<RemoteTrack>>,
    rollbacks: Cell<u32>,
    added_candidates: RefCell<Vec<IceCandidate>>,
}

impl FakeConnection {
    pub fn new(name: impl Into<String>, events: ConnectionEvents) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            name: name.into(),
            events,
            state: Cell::new(SignalingState::Stable),
            ops: Mutex::new(()),
            gate,
            single_step: Cell::new(false),
            closed: Cell::new(false),
            version: Cell::new(0),
            negotiation_pending: Cell::new(false),
            local_tracks: RefCell::new(Vec::new()),
            channels: RefCell::new(Vec::new()),
            local: RefCell::new(None),
            remote: RefCell::new(None),
            remote_ufrag: RefCell::new(None),
            remote_tracks: RefCell::new(Vec::new()),
            rollbacks: Cell::new(0),
            added_candidates: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generation(&self) -> u64 {
        self.events.generation()
    }

    /// Park every following `set_local_description` before it commits.
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Let exactly one parked `set_local_description` through, then hold
    /// again.
    pub fn release_one(&self) {
        self.single_step.set(true);
        self.gate.send_replace(true);
    }

    /// Report negotiation-needed even if a request is already pending.
    pub fn fire_negotiation_needed(&self) {
        self.events.emit(ConnectionEvent::NegotiationNeeded);
    }

    pub fn ufrag(&self) -> String {
        format!("{}-ufrag", self.name)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub fn rollbacks(&self) -> u32 {
        self.rollbacks.get()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.local.borrow().clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.borrow().clone()
    }

    pub fn remote_tracks(&self) -> Vec<RemoteTrack> {
        self.remote_tracks.borrow().clone()
    }

    pub fn local_tracks(&self) -> Vec<LocalTrack> {
        self.local_tracks.borrow().clone()
    }

    pub fn added_candidates(&self) -> Vec<IceCandidate> {
        self.added_candidates.borrow().clone()
    }

    /// Text sent by the session on the channel with `label`.
    pub fn sent_on(&self, label: &str) -> Vec<String> {
        self.channels
            .borrow()
            .iter()
            .filter(|dc| dc.label == label)
            .flat_map(|dc| dc.sent.borrow().clone())
            .map(|data| String::from_utf8_lossy(&data).into_owned())
            .collect()
    }

    /// Pretend the peer wrote `text` into the channel with `label`.
    pub fn deliver_message(&self, label: &str, text: &str) {
        self.events.emit(ConnectionEvent::ChannelMessage {
            label: label.to_owned(),
            data: Bytes::copy_from_slice(text.as_bytes()),
        });
    }

    fn request_negotiation(&self) {
        if !self.negotiation_pending.replace(true) {
            self.events.emit(ConnectionEvent::NegotiationNeeded);
        }
    }

    fn render_sdp(&self, version: u32) -> String {
        let mut lines = vec![
            format!("o=fake {} {}", self.name, version),
            format!("a=ice-ufrag:{}", self.ufrag()),
        ];
        for track in self.local_tracks.borrow().iter() {
            let kind = match track.kind {
                MediaKind::Audio => "audio",
                MediaKind::Video => "video",
            };
            lines.push(format!("a=track:{}:{}:{}", kind, track.stream_id, track.id));
        }
        for channel in self.channels.borrow().iter() {
            lines.push(format!("a=channel:{}", channel.label));
        }
        lines.join("\n")
    }
}

fn parse_ufrag(sdp: &str) -> Option<String> {
    sdp.lines()
        .find_map(|line| line.strip_prefix("a=ice-ufrag:"))
        .map(str::to_owned)
}

fn parse_tracks(sdp: &str) -> Vec<RemoteTrack> {
    sdp.lines()
        .filter_map(|line| line.strip_prefix("a=track:"))
        .filter_map(|rest| {
            let mut parts = rest.splitn(3, ':');
            let kind = match parts.next()? {
                "audio" => MediaKind::Audio,
                _ => MediaKind::Video,
            };
            Some(RemoteTrack {
                stream_id: parts.next()?.to_owned(),
                id: parts.next()?.to_owned(),
                kind,
            })
        })
        .collect()
}

#[async_trait(?Send)]
impl PeerConnection for FakeConnection {
    fn signaling_state(&self) -> SignalingState {
        self.state.get()
    }

    async fn add_track(&self, track: &LocalTrack) -> Result<(), ConnectionError> {
        if self.closed.get() {
            return Err(ConnectionError::Closed);
        }
        self.local_tracks.borrow_mut().push(track.clone());
        self.request_negotiation();
        Ok(())
    }

    async fn create_data_channel(
        &self,
        spec: &DataChannelSpec,
    ) -> Result<Rc<dyn DataChannel>, ConnectionError> {
        if self.closed.get() {
            return Err(ConnectionError::Closed);
        }
        let channel = Rc::new(FakeDataChannel {
            label: spec.label.clone(),
            sent: RefCell::new(Vec::new()),
        });
        self.channels.borrow_mut().push(channel.clone());
        self.request_negotiation();
        Ok(channel)
    }

    async fn set_local_description(&self) -> Result<SessionDescription, ConnectionError> {
        let _op = self.ops.lock().await;

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        if self.single_step.replace(false) {
            self.gate.send_replace(false);
        }
        tokio::task::yield_now().await;

        if self.closed.get() {
            return Err(ConnectionError::Closed);
        }

        let (sdp_type, next) = match self.state.get() {
            SignalingState::HaveRemoteOffer => (SdpType::Answer, SignalingState::Stable),
            SignalingState::Stable | SignalingState::HaveLocalOffer => {
                self.negotiation_pending.set(false);
                (SdpType::Offer, SignalingState::HaveLocalOffer)
            }
            other => return Err(ConnectionError::InvalidState(other)),
        };

        let version = self.version.get() + 1;
        self.version.set(version);
        let description = SessionDescription {
            sdp_type,
            sdp: self.render_sdp(version),
        };
        *self.local.borrow_mut() = Some(description.clone());
        self.state.set(next);

        self.events.emit(ConnectionEvent::IceCandidate(IceCandidate {
            candidate: format!("candidate:{}-{} 1 udp 2122260223 10.0.0.1 5000 typ host", self.name, version),
            sdp_mid: Some("0".to_owned()),
            sdp_m_line_index: Some(0),
            username_fragment: Some(self.ufrag()),
        }));

        Ok(description)
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), ConnectionError> {
        // Candidates that follow this description are checked against it
        // even while it is still queued behind another operation.
        if let Some(ufrag) = parse_ufrag(&description.sdp) {
            *self.remote_ufrag.borrow_mut() = Some(ufrag);
        }

        let _op = self.ops.lock().await;
        tokio::task::yield_now().await;

        if self.closed.get() {
            return Err(ConnectionError::Closed);
        }

        let state = self.state.get();
        let next = match (description.sdp_type, state) {
            (SdpType::Offer, SignalingState::Stable) => SignalingState::HaveRemoteOffer,
            (SdpType::Offer, SignalingState::HaveLocalOffer) => {
                self.rollbacks.set(self.rollbacks.get() + 1);
                SignalingState::HaveRemoteOffer
            }
            (SdpType::Answer, SignalingState::HaveLocalOffer) => SignalingState::Stable,
            (_, state) => return Err(ConnectionError::InvalidState(state)),
        };

        for track in parse_tracks(&description.sdp) {
            let known = self.remote_tracks.borrow().iter().any(|t| t.id == track.id);
            if !known {
                self.remote_tracks.borrow_mut().push(track.clone());
                self.events.emit(ConnectionEvent::Track(track));
            }
        }

        *self.remote.borrow_mut() = Some(description);
        self.state.set(next);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), ConnectionError> {
        let expected = self.remote_ufrag.borrow().clone();
        let Some(expected) = expected else {
            return Err(ConnectionError::NoRemoteDescription);
        };
        if candidate.username_fragment.as_deref() != Some(expected.as_str()) {
            return Err(ConnectionError::CandidateRejected(format!(
                "unknown ufrag {:?}",
                candidate.username_fragment
            )));
        }

        self.added_candidates.borrow_mut().push(candidate);
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.closed.set(true);
        self.state.set(SignalingState::Closed);
        self.gate.send_replace(true);
        Ok(())
    }
}

pub struct FakeDataChannel {
    label: String,
    sent: RefCell<Vec<Bytes>>,
}

#[async_trait(?Send)]
impl DataChannel for FakeDataChannel {
    fn label(&self) -> &str {
        &self.label
    }

    async fn send(&self, data: Bytes) -> Result<(), ConnectionError> {
        self.sent.borrow_mut().push(data);
        Ok(())
    }
}

/// Hands out [`FakeConnection`]s named `{prefix}{n}` and keeps them for
/// inspection.
#[derive(Clone)]
pub struct FakeConnectionFactory {
    prefix: String,
    connections: Rc<RefCell<Vec<Rc<FakeConnection>>>>,
    hold_new: Rc<Cell<bool>>,
}

impl FakeConnectionFactory {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            connections: Rc::new(RefCell::new(Vec::new())),
            hold_new: Rc::new(Cell::new(false)),
        }
    }

    /// Gate every connection created from now on.
    pub fn hold_new_connections(&self, hold: bool) {
        self.hold_new.set(hold);
    }

    pub fn count(&self) -> usize {
        self.connections.borrow().len()
    }

    pub fn connection(&self, index: usize) -> Rc<FakeConnection> {
        self.connections.borrow()[index].clone()
    }

    pub fn latest(&self) -> Rc<FakeConnection> {
        let connections = self.connections.borrow();
        connections
            .last()
            .cloned()
            .expect("factory has not built a connection yet")
    }
}

#[async_trait(?Send)]
impl ConnectionFactory for FakeConnectionFactory {
    async fn create(
        &self,
        events: ConnectionEvents,
    ) -> Result<Rc<dyn PeerConnection>, ConnectionError> {
        let name = format!("{}{}", self.prefix, self.count());
        let connection = Rc::new(FakeConnection::new(name, events));
        if self.hold_new.get() {
            connection.hold();
        }
        self.connections.borrow_mut().push(connection.clone());
        Ok(connection)
    }
}
