use crate::connection::{ConnectionError, ConnectionEvents, DataChannelSpec};
use crate::negotiation::{Effect, NegotiationEvent, NegotiationFlags};
use crate::session::{Link, LinkSlot, NegotiationFault, SessionHandle};
use tracing::{debug, info, warn};

impl SessionHandle {
    /// Create a handle for `generation` and publish local media on it.
    pub(super) async fn build_link(&self, generation: u64) -> Result<Link, ConnectionError> {
        let events = ConnectionEvents::new(generation, self.inner.connection_tx.clone());
        let connection = self.inner.factory.create(events).await?;

        let tracks = self.inner.media.borrow().tracks.clone();
        for track in &tracks {
            connection.add_track(track).await?;
        }

        let chat = connection
            .create_data_channel(&DataChannelSpec::chat())
            .await?;

        Ok(Link {
            generation,
            connection,
            chat,
        })
    }

    /// Throw the current handle away and start over with a fresh one that
    /// carries the same local media. Roles are left as they are.
    pub(super) async fn rebuild(&self) {
        if self.has_left() {
            return;
        }
        if self.step(NegotiationEvent::PeerDeparted) != Some(Effect::Rebuild) {
            return;
        }
        self.inner.offers_in_flight.set(0);

        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);

        if let LinkSlot::Ready(previous) = self.inner.link.send_replace(LinkSlot::Rebuilding) {
            if let Err(err) = previous.connection.close().await {
                warn!("Failed to close retired connection: {}", err);
            }
        }

        match self.build_link(generation).await {
            Ok(link) if self.is_current(generation) => {
                self.inner.link.send_replace(LinkSlot::Ready(link));
                info!(generation, "Connection rebuilt, waiting for a new peer");
            }
            Ok(link) => {
                debug!(generation, "Rebuild superseded by a newer one");
                let _ = link.connection.close().await;
            }
            Err(err) => {
                if self.is_current(generation) {
                    self.inner.link.send_replace(LinkSlot::Closed);
                }
                self.report(NegotiationFault::Connection {
                    error: err.to_string(),
                });
            }
        }
    }

    /// Close the handle and the relay link for good. Handlers still in
    /// flight give up and [`Session::run`](crate::Session::run) returns.
    pub async fn leave(&self) {
        if self.inner.left.send_replace(true) {
            return;
        }
        info!("Leaving call");

        self.inner.generation.set(self.inner.generation.get() + 1);

        let mut state = self.inner.state.get();
        state.flags = NegotiationFlags::default();
        self.inner.state.set(state);
        self.inner.offers_in_flight.set(0);

        if let LinkSlot::Ready(link) = self.inner.link.send_replace(LinkSlot::Closed) {
            if let Err(err) = link.connection.close().await {
                warn!("Failed to close connection: {}", err);
            }
        }

        self.inner.sink.close().await;
    }
}
