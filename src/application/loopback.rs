//! Single-process loopback negotiation
//!
//! Wires two peer connections to each other directly, with no signaling
//! relay in between. Descriptions are handed across in one pass; candidates
//! still go through a per-side pending queue so a candidate that beats the
//! remote description is held and replayed in arrival order, the same
//! discipline the relay variant uses.

use crate::application::ports::{MediaPeer, PeerEvent, PeerFactory, PeerStatus};
use crate::domain::session::NegotiationRole;
use crate::domain::shared::result::Result;
use crate::domain::signaling::{CandidateInit, PendingCandidateQueue};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One end of the loopback pair
struct Side {
    label: &'static str,
    peer: Arc<dyn MediaPeer>,
    pending: PendingCandidateQueue,
    status: PeerStatus,
}

impl Side {
    fn new(label: &'static str, peer: Arc<dyn MediaPeer>) -> Self {
        Self {
            label,
            peer,
            pending: PendingCandidateQueue::new(),
            status: PeerStatus::New,
        }
    }

    /// Queue the candidate, then flush everything the peer can accept
    ///
    /// Push-then-drain keeps arrival order even when earlier candidates are
    /// still parked.
    async fn deliver(&mut self, candidate: CandidateInit) {
        self.pending.push(candidate);
        self.drain().await;
    }

    async fn drain(&mut self) {
        while !self.pending.is_empty() {
            if !self.peer.has_remote_description().await {
                debug!(
                    side = self.label,
                    queued = self.pending.len(),
                    "remote description not set, candidates held"
                );
                break;
            }
            let Some(candidate) = self.pending.pop() else {
                break;
            };
            if let Err(e) = self.peer.add_ice_candidate(candidate).await {
                warn!(side = self.label, error = %e, "failed to apply candidate");
            }
        }
    }
}

/// Two directly wired peer connections in one process
pub struct LoopbackController {
    caller_factory: Arc<dyn PeerFactory>,
    callee_factory: Arc<dyn PeerFactory>,
    caller: Option<Side>,
    callee: Option<Side>,
    caller_rx: Option<mpsc::UnboundedReceiver<PeerEvent>>,
    callee_rx: Option<mpsc::UnboundedReceiver<PeerEvent>>,
    negotiated: bool,
}

impl LoopbackController {
    /// `caller_factory` builds the sending side, `callee_factory` the
    /// receiving side
    pub fn new(caller_factory: Arc<dyn PeerFactory>, callee_factory: Arc<dyn PeerFactory>) -> Self {
        Self {
            caller_factory,
            callee_factory,
            caller: None,
            callee: None,
            caller_rx: None,
            callee_rx: None,
            negotiated: false,
        }
    }

    pub fn negotiated(&self) -> bool {
        self.negotiated
    }

    pub fn pending_candidates(&self) -> usize {
        let caller = self.caller.as_ref().map_or(0, |s| s.pending.len());
        let callee = self.callee.as_ref().map_or(0, |s| s.pending.len());
        caller + callee
    }

    /// Create both peer connections and run the offer/answer exchange
    pub async fn start(&mut self) -> Result<()> {
        let (caller_tx, caller_rx) = mpsc::unbounded_channel();
        let (callee_tx, callee_rx) = mpsc::unbounded_channel();

        let caller = self
            .caller_factory
            .create_peer(NegotiationRole::Offerer, caller_tx)
            .await?;
        let callee = self
            .callee_factory
            .create_peer(NegotiationRole::Answerer, callee_tx)
            .await?;

        let offer = caller.create_offer().await?;
        caller.set_local_description(offer.clone()).await?;
        callee.set_remote_description(offer).await?;

        let answer = callee.create_answer().await?;
        callee.set_local_description(answer.clone()).await?;
        caller.set_remote_description(answer).await?;

        self.caller = Some(Side::new("caller", caller));
        self.callee = Some(Side::new("callee", callee));
        self.caller_rx = Some(caller_rx);
        self.callee_rx = Some(callee_rx);
        self.negotiated = true;
        info!("loopback descriptions exchanged");
        Ok(())
    }

    /// Shuttle candidates and state changes between the two sides
    ///
    /// Returns once both peer connections report themselves connected, or
    /// when both event channels close.
    pub async fn process_events(&mut self) {
        let (Some(mut caller_rx), Some(mut callee_rx)) =
            (self.caller_rx.take(), self.callee_rx.take())
        else {
            warn!("loopback not started");
            return;
        };

        loop {
            tokio::select! {
                ev = caller_rx.recv() => {
                    match ev {
                        Some(ev) => self.handle_event("caller", ev).await,
                        None => break,
                    }
                }
                ev = callee_rx.recv() => {
                    match ev {
                        Some(ev) => self.handle_event("callee", ev).await,
                        None => break,
                    }
                }
            }

            let caller_up = self.caller.as_ref().is_some_and(|s| s.status == PeerStatus::Connected);
            let callee_up = self.callee.as_ref().is_some_and(|s| s.status == PeerStatus::Connected);
            if caller_up && callee_up {
                info!("loopback pair connected");
                break;
            }
        }
    }

    async fn handle_event(&mut self, from: &'static str, event: PeerEvent) {
        match event {
            PeerEvent::Candidate(candidate) => {
                // A candidate from one side is delivered straight to the other
                let other = if from == "caller" {
                    self.callee.as_mut()
                } else {
                    self.caller.as_mut()
                };
                match other {
                    Some(side) => side.deliver(candidate).await,
                    None => debug!(side = from, "candidate dropped, pair torn down"),
                }
            }
            PeerEvent::Track { id, kind } => {
                info!(side = from, track = %id, %kind, "remote track received");
            }
            PeerEvent::StateChanged(status) => {
                debug!(side = from, %status, "peer connection state changed");
                let side = if from == "caller" {
                    self.caller.as_mut()
                } else {
                    self.callee.as_mut()
                };
                if let Some(side) = side {
                    side.status = status;
                }
            }
        }
    }

    /// Close both peer connections; best-effort and idempotent
    pub async fn stop(&mut self) {
        for side in [self.caller.take(), self.callee.take()].into_iter().flatten() {
            if let Err(e) = side.peer.close().await {
                warn!(side = side.label, error = %e, "failed to close peer connection");
            }
        }
        self.negotiated = false;
    }
}
