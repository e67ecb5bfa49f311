use tandem_core::SignalingState;
use tandem_peer::ConnectionError;
use tokio::task::LocalSet;

use crate::integration::{connected_pair, init_tracing};
use crate::utils::{FakeRelay, settle};

#[tokio::test(start_paused = true)]
async fn test_leave_closes_connection() {
    init_tracing();

    LocalSet::new()
        .run_until(async {
            let relay = FakeRelay::new();
            let (alice, mut bob) = connected_pair(&relay).await;

            alice.handle.leave().await;

            assert!(alice.handle.has_left());
            assert!(alice.connection().is_closed());
            assert_eq!(alice.signaling_state(), SignalingState::Closed);
            assert!(matches!(
                alice.handle.send_chat("anyone?").await,
                Err(ConnectionError::Closed)
            ));
            assert!(!relay.is_member(alice.member), "leaving hangs up on the relay");

            settle().await;
            assert!(!alice.is_running());

            // Bob hears about the departure through the relay, and his
            // rebuilt handle offers into the now empty room.
            assert_eq!(bob.factory.count(), 2);
            assert_eq!(bob.signaling_state(), SignalingState::HaveLocalOffer);
            assert!(bob.faults().is_empty());
        })
        .await;
}
