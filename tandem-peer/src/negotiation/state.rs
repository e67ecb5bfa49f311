use std::fmt;
use tandem_core::{PeerRole, SignalingState};

/// Per-session flags that let a handler notice a collision that happened
/// while it was suspended.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationFlags {
    /// Set strictly between the start and completion of producing a local
    /// offer. Never set while an answer is produced.
    pub making_offer: bool,

    /// Set strictly while an inbound answer is being applied.
    pub setting_remote_answer_pending: bool,

    /// Latched when an inbound offer was dropped because of a collision.
    pub ignoring_offer: bool,
}

/// Everything the collision policy looks at.
///
/// `signaling` is observed from the connection handle right before each
/// transition; the transition function never changes it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationState {
    pub role: PeerRole,
    pub signaling: SignalingState,
    pub flags: NegotiationFlags,
}

impl NegotiationState {
    pub fn ready_for_offer(&self) -> bool {
        !self.flags.making_offer
            && (self.signaling.is_stable() || self.flags.setting_remote_answer_pending)
    }

    pub fn phase(&self) -> Phase {
        if self.signaling.is_closed() {
            Phase::Closed
        } else if self.flags.making_offer {
            Phase::MakingOffer
        } else if self.flags.setting_remote_answer_pending {
            Phase::ApplyingAnswer
        } else {
            match self.signaling {
                SignalingState::HaveLocalOffer | SignalingState::HaveRemotePranswer => {
                    Phase::AwaitingAnswer
                }
                SignalingState::HaveRemoteOffer | SignalingState::HaveLocalPranswer => {
                    Phase::Answering
                }
                _ => Phase::Idle,
            }
        }
    }
}

/// Coarse view of where a negotiation round stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    MakingOffer,
    AwaitingAnswer,
    ApplyingAnswer,
    Answering,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::MakingOffer => "making-offer",
            Self::AwaitingAnswer => "awaiting-answer",
            Self::ApplyingAnswer => "applying-answer",
            Self::Answering => "answering",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
