use tandem_core::SignalingState;
use tandem_peer::{LocalTrack, NegotiationFlags, SessionEvent};
use tokio::task::LocalSet;

use crate::integration::{connected_pair, init_tracing};
use crate::utils::{FakeRelay, settle};

#[tokio::test(start_paused = true)]
async fn test_departure_mid_answer() {
    init_tracing();

    LocalSet::new()
        .run_until(async {
            let relay = FakeRelay::new();
            let (mut alice, bob) = connected_pair(&relay).await;
            let retired = alice.connection();

            // Alice accepts Bob's next offer but her answer stays parked.
            retired.hold();
            bob.handle
                .add_track(LocalTrack::video("bob-screen"))
                .await
                .expect("Failed to add track");
            settle().await;
            assert_eq!(alice.signaling_state(), SignalingState::HaveRemoteOffer);

            relay.leave(bob.member);
            settle().await;

            assert!(retired.is_closed());
            assert_eq!(alice.factory.count(), 2);
            assert_eq!(
                alice.count_events(|event| matches!(event, SessionEvent::PeerLeft)),
                1
            );
            assert!(alice.faults().is_empty(), "alice: {:?}", alice.faults());
            assert_eq!(
                alice.handle.negotiation_state().flags,
                NegotiationFlags::default()
            );
        })
        .await;
}
