use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::Pranswer => "pranswer",
            Self::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    #[serde(default)]
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    pub fn is_offer(&self) -> bool {
        self.sdp_type == SdpType::Offer
    }

    pub fn is_answer(&self) -> bool {
        self.sdp_type == SdpType::Answer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalMessageError {
    #[error("signal carries both a description and a candidate")]
    Ambiguous,
    #[error("signal carries neither a description nor a candidate")]
    Empty,
}

/// Unit exchanged between the two endpoints through the relay.
///
/// On the wire this is `{"description": ..}` or `{"candidate": ..}`, never
/// both. `{"candidate": null}` marks the end of the sender's gathering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SignalWire", into = "SignalWire")]
pub enum SignalMessage {
    Description(SessionDescription),
    Candidate(IceCandidate),
    EndOfCandidates,
}

#[derive(Serialize, Deserialize)]
struct SignalWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<SessionDescription>,
    /// `Some(None)` is an explicit `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    candidate: Option<Option<IceCandidate>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TryFrom<SignalWire> for SignalMessage {
    type Error = SignalMessageError;

    fn try_from(wire: SignalWire) -> Result<Self, Self::Error> {
        match (wire.description, wire.candidate) {
            (Some(description), None) => Ok(Self::Description(description)),
            (None, Some(Some(candidate))) => Ok(Self::Candidate(candidate)),
            (None, Some(None)) => Ok(Self::EndOfCandidates),
            (Some(_), Some(_)) => Err(SignalMessageError::Ambiguous),
            (None, None) => Err(SignalMessageError::Empty),
        }
    }
}

impl From<SignalMessage> for SignalWire {
    fn from(msg: SignalMessage) -> Self {
        match msg {
            SignalMessage::Description(description) => Self {
                description: Some(description),
                candidate: None,
            },
            SignalMessage::Candidate(candidate) => Self {
                description: None,
                candidate: Some(Some(candidate)),
            },
            SignalMessage::EndOfCandidates => Self {
                description: None,
                candidate: Some(None),
            },
        }
    }
}

/// Envelope spoken between a client and the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RelayFrame {
    /// The relay accepted this client into the room.
    Connect,
    /// Another member joined the room.
    ConnectedPeer,
    /// A member left the room.
    DisconnectedPeer,
    Signal(SignalMessage),
}
