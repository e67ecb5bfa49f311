use crate::connection::ConnectionError;
use crate::negotiation::{Effect, NegotiationEvent};
use crate::session::{NegotiationFault, SessionHandle};
use tandem_core::{IceCandidate, SessionDescription, SignalMessage};
use tracing::{debug, info, trace, warn};

impl SessionHandle {
    pub(super) async fn process_signal(&self, signal: SignalMessage) {
        match signal {
            SignalMessage::Description(description) => {
                self.process_description(description).await
            }
            SignalMessage::Candidate(candidate) => self.process_candidate(candidate).await,
            SignalMessage::EndOfCandidates => debug!("Peer finished gathering candidates"),
        }
    }

    async fn process_description(&self, description: SessionDescription) {
        let Some(link) = self.current_link().await else {
            warn!("Dropping {} for a closed session", description.sdp_type);
            return;
        };

        let sdp_type = description.sdp_type;
        debug!("Received remote {}", sdp_type);

        match self.step(NegotiationEvent::RemoteDescription(sdp_type)) {
            Some(Effect::ApplyRemoteDescription) => {}
            Some(Effect::IgnoreOffer) => {
                info!("Ignoring colliding offer from peer");
                return;
            }
            _ => return,
        }

        let applied = link.connection.set_remote_description(description).await;

        if !self.is_current(link.generation) {
            debug!("Connection replaced while applying remote {}", sdp_type);
            return;
        }

        let effect = self.step(NegotiationEvent::RemoteDescriptionSettled {
            sdp_type,
            applied: applied.is_ok(),
        });

        if let Err(err) = applied {
            self.report(NegotiationFault::RemoteDescription {
                sdp_type,
                error: err.to_string(),
            });
            return;
        }

        if effect != Some(Effect::SendAnswer) {
            return;
        }

        match self.emit_local_description(&link).await {
            Ok(_) | Err(ConnectionError::Superseded) => {}
            Err(err) => self.report(NegotiationFault::LocalDescription {
                error: err.to_string(),
            }),
        }
    }

    async fn process_candidate(&self, candidate: IceCandidate) {
        let Some(link) = self.current_link().await else {
            return;
        };

        let Err(err) = link.connection.add_ice_candidate(candidate).await else {
            return;
        };

        if !self.is_current(link.generation) {
            return;
        }

        match self.step(NegotiationEvent::CandidateFailed) {
            Some(Effect::SuppressCandidateFault) => {
                trace!("Dropping candidate of an ignored offer: {}", err);
            }
            _ => self.report(NegotiationFault::Candidate {
                error: err.to_string(),
            }),
        }
    }
}
