use async_trait::async_trait;
use std::cell::RefCell;
use std::rc::Rc;
use tandem_core::{RelayFrame, SdpType, SignalMessage};
use tandem_peer::SignalSink;
use tokio::sync::mpsc;

pub type MemberId = usize;

struct Member {
    id: MemberId,
    tx: mpsc::UnboundedSender<RelayFrame>,
}

#[derive(Default)]
struct RelayState {
    next_id: MemberId,
    members: Vec<Member>,
    log: Vec<(MemberId, SignalMessage)>,
}

/// Single-room relay living in the test: joiners get `Connect`, everyone
/// else `ConnectedPeer`; signals go to all other members in send order.
#[derive(Clone, Default)]
pub struct FakeRelay {
    state: Rc<RefCell<RelayState>>,
}

impl FakeRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self) -> (MemberId, FakeRelaySink, mpsc::UnboundedReceiver<RelayFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.borrow_mut();

        let id = state.next_id;
        state.next_id += 1;

        let _ = tx.send(RelayFrame::Connect);
        for member in &state.members {
            let _ = member.tx.send(RelayFrame::ConnectedPeer);
        }
        state.members.push(Member { id, tx });

        let sink = FakeRelaySink {
            relay: self.clone(),
            member: id,
        };
        (id, sink, rx)
    }

    /// Drop the member's socket and tell the rest of the room.
    pub fn leave(&self, id: MemberId) {
        let mut state = self.state.borrow_mut();
        let before = state.members.len();
        state.members.retain(|member| member.id != id);
        if state.members.len() == before {
            return;
        }
        for member in &state.members {
            let _ = member.tx.send(RelayFrame::DisconnectedPeer);
        }
    }

    pub fn is_member(&self, id: MemberId) -> bool {
        self.state.borrow().members.iter().any(|member| member.id == id)
    }

    /// Deliver a frame to one member as if the relay had sent it.
    pub fn inject(&self, id: MemberId, frame: RelayFrame) {
        let state = self.state.borrow();
        if let Some(member) = state.members.iter().find(|member| member.id == id) {
            let _ = member.tx.send(frame);
        }
    }

    /// Everything `id` has sent so far.
    pub fn sent_by(&self, id: MemberId) -> Vec<SignalMessage> {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|(from, _)| *from == id)
            .map(|(_, signal)| signal.clone())
            .collect()
    }

    /// Types of the descriptions `id` has sent, in order.
    pub fn descriptions_sent_by(&self, id: MemberId) -> Vec<SdpType> {
        self.sent_by(id)
            .into_iter()
            .filter_map(|signal| match signal {
                SignalMessage::Description(d) => Some(d.sdp_type),
                SignalMessage::Candidate(_) | SignalMessage::EndOfCandidates => None,
            })
            .collect()
    }

    fn forward(&self, from: MemberId, signal: SignalMessage) {
        let mut state = self.state.borrow_mut();
        for member in state.members.iter().filter(|member| member.id != from) {
            let _ = member.tx.send(RelayFrame::Signal(signal.clone()));
        }
        state.log.push((from, signal));
    }
}

pub struct FakeRelaySink {
    relay: FakeRelay,
    member: MemberId,
}

#[async_trait(?Send)]
impl SignalSink for FakeRelaySink {
    async fn send_signal(&self, signal: SignalMessage) {
        tracing::debug!("[FakeRelay] member {} sends {:?}", self.member, signal);
        self.relay.forward(self.member, signal);
    }

    async fn close(&self) {
        self.relay.leave(self.member);
    }
}
