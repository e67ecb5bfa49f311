mod connection_config;
mod connection_event;
mod rtc_connection;

pub use connection_config::ConnectionConfig;
pub use connection_event::{ConnectionEvent, ConnectionEvents};
pub use rtc_connection::{RtcConnection, RtcConnectionFactory, RtcDataChannel};

use async_trait::async_trait;
use bytes::Bytes;
use std::rc::Rc;
use tandem_core::utils::{CHAT_CHANNEL_ID, CHAT_CHANNEL_LABEL};
use tandem_core::{IceCandidate, SessionDescription, SignalingState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection is closed")]
    Closed,

    /// The session replaced the handle while the operation was suspended.
    #[error("connection was replaced mid-operation")]
    Superseded,

    #[error("operation not allowed in signaling state {0}")]
    InvalidState(SignalingState),

    #[error("no remote description to attach the candidate to")]
    NoRemoteDescription,

    #[error("candidate rejected: {0}")]
    CandidateRejected(String),

    #[error("webrtc error: {0}")]
    Rtc(#[from] webrtc::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

/// A local track to publish on every fresh connection handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: MediaKind,
}

impl LocalTrack {
    pub fn audio(stream_id: impl Into<String>) -> Self {
        let stream_id = stream_id.into();
        Self {
            id: format!("{stream_id}-audio"),
            stream_id,
            kind: MediaKind::Audio,
        }
    }

    pub fn video(stream_id: impl Into<String>) -> Self {
        let stream_id = stream_id.into();
        Self {
            id: format!("{stream_id}-video"),
            stream_id,
            kind: MediaKind::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: MediaKind,
}

/// Out-of-band negotiated data channel: both sides create it with the same
/// label and stream id, so neither waits for a `data-channel-received`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChannelSpec {
    pub label: String,
    pub id: u16,
}

impl DataChannelSpec {
    pub fn chat() -> Self {
        Self {
            label: CHAT_CHANNEL_LABEL.to_owned(),
            id: CHAT_CHANNEL_ID,
        }
    }
}

/// Everything the lifecycle manager re-publishes after a rebuild.
#[derive(Debug, Clone, Default)]
pub struct LocalMedia {
    pub tracks: Vec<LocalTrack>,
}

impl LocalMedia {
    pub fn new(tracks: Vec<LocalTrack>) -> Self {
        Self { tracks }
    }

    /// One audio and one video track on a shared stream.
    pub fn camera_and_microphone(stream_id: &str) -> Self {
        Self::new(vec![LocalTrack::audio(stream_id), LocalTrack::video(stream_id)])
    }
}

/// The peer-connection capability the negotiation core drives.
///
/// Implementations report everything they observe through the
/// [`ConnectionEvents`] they were built with.
#[async_trait(?Send)]
pub trait PeerConnection {
    fn signaling_state(&self) -> SignalingState;

    async fn add_track(&self, track: &LocalTrack) -> Result<(), ConnectionError>;

    async fn create_data_channel(
        &self,
        spec: &DataChannelSpec,
    ) -> Result<Rc<dyn DataChannel>, ConnectionError>;

    /// Create an offer or answer, whichever the signaling state calls for,
    /// and commit it as the local description.
    async fn set_local_description(&self) -> Result<SessionDescription, ConnectionError>;

    /// Apply a remote description. An offer arriving in `have-local-offer`
    /// rolls the local offer back first.
    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), ConnectionError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), ConnectionError>;

    async fn close(&self) -> Result<(), ConnectionError>;
}

#[async_trait(?Send)]
pub trait DataChannel {
    fn label(&self) -> &str;

    async fn send(&self, data: Bytes) -> Result<(), ConnectionError>;
}

/// Builds fresh connection handles from a fixed configuration.
#[async_trait(?Send)]
pub trait ConnectionFactory {
    async fn create(
        &self,
        events: ConnectionEvents,
    ) -> Result<Rc<dyn PeerConnection>, ConnectionError>;
}
