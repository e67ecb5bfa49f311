use async_trait::async_trait;
use tandem_core::SignalMessage;

/// Where the session sends signals bound for the other member of the room.
#[async_trait(?Send)]
pub trait SignalSink {
    async fn send_signal(&self, signal: SignalMessage);

    /// Hang up on the relay once the session left the call.
    async fn close(&self) {}
}
