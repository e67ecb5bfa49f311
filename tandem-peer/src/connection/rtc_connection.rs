use crate::connection::{
    ConnectionConfig, ConnectionError, ConnectionEvent, ConnectionEvents, ConnectionFactory,
    DataChannel, DataChannelSpec, LocalTrack, MediaKind, PeerConnection, RemoteTrack,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::rc::Rc;
use std::sync::Arc;
use tandem_core::{IceCandidate, SdpType, SessionDescription, SignalingState};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Connection handle backed by a native `webrtc` peer connection.
pub struct RtcConnection {
    peer_connection: Arc<RTCPeerConnection>,
    events: ConnectionEvents,
}

impl RtcConnection {
    pub async fn new(
        config: &ConnectionConfig,
        events: ConnectionEvents,
    ) -> Result<Self, ConnectionError> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let negotiation_events = events.clone();
        peer_connection.on_negotiation_needed(Box::new(move || {
            let events = negotiation_events.clone();
            Box::pin(async move {
                events.emit(ConnectionEvent::NegotiationNeeded);
            })
        }));

        let ice_events = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let events = ice_events.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                events.emit(ConnectionEvent::IceCandidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                }));
            })
        }));

        let track_events = events.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let events = track_events.clone();
            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => MediaKind::Audio,
                    _ => MediaKind::Video,
                };
                events.emit(ConnectionEvent::Track(RemoteTrack {
                    id: track.id(),
                    stream_id: track.stream_id(),
                    kind,
                }));
            })
        }));

        let dc_events = events.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let events = dc_events.clone();
            Box::pin(async move {
                debug!("Peer announced DataChannel '{}'", dc.label());
                let label = dc.label().to_owned();
                forward_messages(&dc, events.clone());
                events.emit(ConnectionEvent::DataChannel { label });
            })
        }));

        Ok(Self {
            peer_connection,
            events,
        })
    }
}

fn forward_messages(dc: &Arc<RTCDataChannel>, events: ConnectionEvents) {
    let label = dc.label().to_owned();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let events = events.clone();
        let label = label.clone();
        Box::pin(async move {
            events.emit(ConnectionEvent::ChannelMessage {
                label,
                data: msg.data,
            });
        })
    }));
}

fn signaling_state_of(state: RTCSignalingState) -> SignalingState {
    match state {
        RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
        RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
        RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
        RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
        RTCSignalingState::Closed => SignalingState::Closed,
        _ => SignalingState::Stable,
    }
}

fn to_rtc_description(
    description: SessionDescription,
) -> Result<RTCSessionDescription, ConnectionError> {
    let desc = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(description.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(description.sdp)?,
        SdpType::Rollback => rollback_description(description.sdp),
    };
    Ok(desc)
}

fn from_rtc_description(
    desc: RTCSessionDescription,
    state: SignalingState,
) -> Result<SessionDescription, ConnectionError> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        _ => return Err(ConnectionError::InvalidState(state)),
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}

/// `webrtc` parses every local description, a rollback included, so it has
/// to carry the SDP of the offer it undoes.
fn rollback_description(sdp: String) -> RTCSessionDescription {
    let mut rollback = RTCSessionDescription::default();
    rollback.sdp_type = RTCSdpType::Rollback;
    rollback.sdp = sdp;
    rollback
}

#[async_trait(?Send)]
impl PeerConnection for RtcConnection {
    fn signaling_state(&self) -> SignalingState {
        signaling_state_of(self.peer_connection.signaling_state())
    }

    async fn add_track(&self, track: &LocalTrack) -> Result<(), ConnectionError> {
        let mime_type = match track.kind {
            MediaKind::Audio => MIME_TYPE_OPUS,
            MediaKind::Video => MIME_TYPE_VP8,
        };
        let local = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            track.id.clone(),
            track.stream_id.clone(),
        ));

        self.peer_connection
            .add_track(local as Arc<dyn TrackLocal + Send + Sync>)
            .await?;
        Ok(())
    }

    async fn create_data_channel(
        &self,
        spec: &DataChannelSpec,
    ) -> Result<Rc<dyn DataChannel>, ConnectionError> {
        let init = RTCDataChannelInit {
            negotiated: Some(spec.id),
            ..Default::default()
        };
        let dc = self
            .peer_connection
            .create_data_channel(&spec.label, Some(init))
            .await?;

        forward_messages(&dc, self.events.clone());

        Ok(Rc::new(RtcDataChannel {
            label: spec.label.clone(),
            inner: dc,
        }))
    }

    async fn set_local_description(&self) -> Result<SessionDescription, ConnectionError> {
        let state = self.signaling_state();
        let desc = match state {
            SignalingState::Closed => return Err(ConnectionError::Closed),
            SignalingState::HaveRemoteOffer | SignalingState::HaveLocalPranswer => {
                self.peer_connection.create_answer(None).await?
            }
            _ => self.peer_connection.create_offer(None).await?,
        };

        self.peer_connection
            .set_local_description(desc.clone())
            .await?;

        from_rtc_description(desc, state)
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), ConnectionError> {
        if description.is_offer() && self.signaling_state() == SignalingState::HaveLocalOffer {
            info!("Rolling back local offer to accept the remote one");
            let pending = self
                .peer_connection
                .pending_local_description()
                .await
                .map(|offer| offer.sdp)
                .unwrap_or_default();
            self.peer_connection
                .set_local_description(rollback_description(pending))
                .await?;
        }

        let desc = to_rtc_description(description)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), ConnectionError> {
        if self.peer_connection.remote_description().await.is_none() {
            return Err(ConnectionError::NoRemoteDescription);
        }

        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

pub struct RtcDataChannel {
    label: String,
    inner: Arc<RTCDataChannel>,
}

#[async_trait(?Send)]
impl DataChannel for RtcDataChannel {
    fn label(&self) -> &str {
        &self.label
    }

    async fn send(&self, data: Bytes) -> Result<(), ConnectionError> {
        self.inner.send(&data).await?;
        Ok(())
    }
}

/// Builds [`RtcConnection`]s from one shared configuration.
#[derive(Debug, Clone, Default)]
pub struct RtcConnectionFactory {
    config: ConnectionConfig,
}

impl RtcConnectionFactory {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait(?Send)]
impl ConnectionFactory for RtcConnectionFactory {
    async fn create(
        &self,
        events: ConnectionEvents,
    ) -> Result<Rc<dyn PeerConnection>, ConnectionError> {
        let connection = RtcConnection::new(&self.config, events).await?;
        Ok(Rc::new(connection))
    }
}
