use crate::negotiation::state::{NegotiationFlags, NegotiationState};
use tandem_core::{PeerRole, SdpType, SignalingState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationEvent {
    /// The relay (re)admitted us. Roles are derived afresh from here on.
    RelayConnected,

    /// Someone joined the room after us.
    PeerJoined,

    /// The other member left; the handle is about to be rebuilt.
    PeerDeparted,

    /// The connection asked for a new offer.
    NegotiationNeeded,

    /// Producing and sending the local offer finished, successfully or not.
    LocalOfferSettled,

    /// A description arrived from the peer.
    RemoteDescription(SdpType),

    /// Applying a remote description finished.
    RemoteDescriptionSettled { sdp_type: SdpType, applied: bool },

    /// Adding a remote candidate to the pool failed.
    CandidateFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Produce, commit and transmit a local offer.
    SendOffer,

    /// Drop the inbound offer without touching anything else.
    IgnoreOffer,

    /// Apply the inbound description as the remote description.
    ApplyRemoteDescription,

    /// Produce, commit and transmit a local answer.
    SendAnswer,

    /// The candidate belonged to an offer we ignored.
    SuppressCandidateFault,

    /// The candidate failure is a genuine fault.
    ReportCandidateFault,

    /// Close the handle and build a fresh one.
    Rebuild,
}

pub fn transition(
    state: NegotiationState,
    event: NegotiationEvent,
) -> (NegotiationState, Option<Effect>) {
    let mut next = state;

    let effect = match event {
        NegotiationEvent::RelayConnected => {
            next.role = PeerRole::Impolite;
            None
        }

        NegotiationEvent::PeerJoined => {
            next.role = PeerRole::Polite;
            None
        }

        NegotiationEvent::PeerDeparted => {
            next.flags = NegotiationFlags::default();
            next.signaling = SignalingState::Stable;
            Some(Effect::Rebuild)
        }

        NegotiationEvent::NegotiationNeeded => {
            if state.signaling.is_closed() {
                None
            } else {
                next.flags.making_offer = true;
                Some(Effect::SendOffer)
            }
        }

        NegotiationEvent::LocalOfferSettled => {
            next.flags.making_offer = false;
            None
        }

        NegotiationEvent::RemoteDescription(sdp_type) => {
            let offer_collision = sdp_type == SdpType::Offer && !state.ready_for_offer();
            next.flags.ignoring_offer = !state.role.is_polite() && offer_collision;

            if next.flags.ignoring_offer {
                Some(Effect::IgnoreOffer)
            } else {
                next.flags.setting_remote_answer_pending = sdp_type == SdpType::Answer;
                Some(Effect::ApplyRemoteDescription)
            }
        }

        NegotiationEvent::RemoteDescriptionSettled { sdp_type, applied } => {
            next.flags.setting_remote_answer_pending = false;
            (applied && sdp_type == SdpType::Offer).then_some(Effect::SendAnswer)
        }

        NegotiationEvent::CandidateFailed => {
            if state.flags.ignoring_offer {
                Some(Effect::SuppressCandidateFault)
            } else {
                Some(Effect::ReportCandidateFault)
            }
        }
    };

    (next, effect)
}
