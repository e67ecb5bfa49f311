use crate::connection::ConnectionError;
use crate::negotiation::{Effect, NegotiationEvent};
use crate::session::{Link, NegotiationFault, SessionHandle};
use tandem_core::{SessionDescription, SignalMessage};
use tracing::{debug, info, warn};

impl SessionHandle {
    pub(super) async fn on_negotiation_needed(&self, generation: u64) {
        let Some(link) = self.current_link().await else {
            return;
        };
        if link.generation != generation {
            return;
        }

        if self.inner.state.get().flags.making_offer {
            warn!("Negotiation needed while an offer is already in flight");
        }

        if self.step(NegotiationEvent::NegotiationNeeded) != Some(Effect::SendOffer) {
            return;
        }
        let in_flight = &self.inner.offers_in_flight;
        in_flight.set(in_flight.get() + 1);

        info!("RTC negotiation needed. Sending offer.");
        let result = self.emit_local_description(&link).await;

        if !self.is_current(link.generation) {
            debug!("Connection replaced while offering; abandoning stale offer");
            return;
        }

        // making_offer stays up until the last overlapping offer is done.
        in_flight.set(in_flight.get().saturating_sub(1));
        if in_flight.get() == 0 {
            self.step(NegotiationEvent::LocalOfferSettled);
        } else {
            debug!(in_flight = in_flight.get(), "Another offer is still in flight");
        }

        if let Err(err) = result {
            self.report(NegotiationFault::LocalDescription {
                error: err.to_string(),
            });
        }
    }

    /// Produce whatever local description the signaling state calls for,
    /// commit it and transmit it, unless the link was retired meanwhile.
    pub(super) async fn emit_local_description(
        &self,
        link: &Link,
    ) -> Result<SessionDescription, ConnectionError> {
        let result = link.connection.set_local_description().await;

        if !self.is_current(link.generation) {
            return Err(ConnectionError::Superseded);
        }
        let description = result?;

        debug!("Sending local {}", description.sdp_type);
        self.inner
            .sink
            .send_signal(SignalMessage::Description(description.clone()))
            .await;

        Ok(description)
    }
}
