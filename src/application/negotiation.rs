//! Relay-mediated negotiation controller
//!
//! Drives one peer connection through the offer/answer exchange using
//! messages from the signaling relay. Candidates that arrive before the
//! remote description is set are parked in the pending queue and replayed,
//! in arrival order, once it is available.

use crate::application::ports::{LocalMedia, MediaPeer, PeerEvent, PeerFactory, PeerStatus};
use crate::domain::session::{NegotiationRole, SessionState};
use crate::domain::shared::value_objects::SessionId;
use crate::domain::signaling::{
    CandidateInit, PendingCandidateQueue, SdpType, SessionDescription, SignalMessage,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, trace, warn};

/// Why a session is being torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Local stop action; the remote side must still be told
    Local,
    /// The remote side sent Close
    Remote,
    /// The signaling link dropped; nobody is left to tell
    LinkLost,
}

/// Negotiation controller for the relay-mediated variant
pub struct NegotiationController {
    session_id: SessionId,
    state: SessionState,
    role: Option<NegotiationRole>,
    factory: Arc<dyn PeerFactory>,
    peer: Option<Arc<dyn MediaPeer>>,
    media: Option<Box<dyn LocalMedia>>,
    pending: PendingCandidateQueue,
    outbound: mpsc::UnboundedSender<SignalMessage>,
    peer_events_tx: mpsc::UnboundedSender<PeerEvent>,
    peer_events_rx: Option<mpsc::UnboundedReceiver<PeerEvent>>,
    link_shutdown: watch::Sender<bool>,
    started_at: DateTime<Utc>,
}

impl NegotiationController {
    /// Create an idle controller
    ///
    /// `outbound` feeds the signaling link's writer; `link_shutdown` is
    /// flipped at teardown so the link closes with the session.
    pub fn new(
        factory: Arc<dyn PeerFactory>,
        outbound: mpsc::UnboundedSender<SignalMessage>,
        link_shutdown: watch::Sender<bool>,
    ) -> Self {
        let (peer_events_tx, peer_events_rx) = mpsc::unbounded_channel();
        Self {
            session_id: SessionId::new(),
            state: SessionState::Idle,
            role: None,
            factory,
            peer: None,
            media: None,
            pending: PendingCandidateQueue::new(),
            outbound,
            peer_events_tx,
            peer_events_rx: Some(peer_events_rx),
            link_shutdown,
            started_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> Option<NegotiationRole> {
        self.role
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending.len()
    }

    /// Take ownership of the captured stream and announce it to the relay
    ///
    /// Mirrors the capture-then-Open handshake: the relay answers by
    /// assigning Offer/Answer roles to the two connected clients.
    pub fn open(&mut self, media: Box<dyn LocalMedia>) {
        self.media = Some(media);
        if self.outbound.send(SignalMessage::Open).is_err() {
            warn!(session = %self.session_id, "signaling link gone, Open not sent");
        }
    }

    /// Process link messages and peer events until the link drops or the
    /// session closes
    pub async fn run(&mut self, mut inbound: mpsc::UnboundedReceiver<SignalMessage>) {
        let Some(mut peer_events) = self.peer_events_rx.take() else {
            warn!(session = %self.session_id, "controller already running");
            return;
        };

        loop {
            tokio::select! {
                msg = inbound.recv() => {
                    match msg {
                        Some(msg) => self.handle_signal(msg).await,
                        None => {
                            info!(session = %self.session_id, "signaling link dropped");
                            self.stop(CloseReason::LinkLost).await;
                        }
                    }
                }
                ev = peer_events.recv() => {
                    // The sender half lives in self, so recv never yields None
                    if let Some(ev) = ev {
                        self.handle_peer_event(ev).await;
                    }
                }
            }

            if self.state == SessionState::Closed {
                break;
            }
        }
    }

    /// Dispatch one signaling message
    ///
    /// Failures of individual negotiation steps are logged and swallowed;
    /// the session keeps going until the user stops it.
    pub async fn handle_signal(&mut self, msg: SignalMessage) {
        if self.state == SessionState::Closed {
            debug!(session = %self.session_id, kind = msg.kind(), "ignoring message after close");
            return;
        }
        trace!(session = %self.session_id, kind = msg.kind(), "dispatching signal");

        match msg {
            SignalMessage::Offer => self.start_peer(NegotiationRole::Offerer).await,
            SignalMessage::Answer => self.start_peer(NegotiationRole::Answerer).await,
            SignalMessage::Sdp { sdp } => self.handle_description(sdp).await,
            SignalMessage::Ice { candidate } => self.handle_candidate(candidate).await,
            SignalMessage::Close => self.stop(CloseReason::Remote).await,
            SignalMessage::Pong => debug!(session = %self.session_id, "pong"),
            // Ping and Open are client-to-relay messages; harmless if echoed back
            other => debug!(session = %self.session_id, kind = other.kind(), "discarding unexpected message"),
        }

        self.drain_pending().await;
    }

    /// Create a fresh peer connection and take the given role
    async fn start_peer(&mut self, role: NegotiationRole) {
        if !self.state.can_transition_to(SessionState::Negotiating) {
            warn!(
                session = %self.session_id,
                state = %self.state,
                "cannot start negotiation in current state"
            );
            return;
        }

        // A repeated role assignment replaces the previous peer connection
        if let Some(old) = self.peer.take() {
            if let Err(e) = old.close().await {
                warn!(session = %self.session_id, error = %e, "failed to close previous peer connection");
            }
        }
        self.pending.clear();

        let peer = match self
            .factory
            .create_peer(role, self.peer_events_tx.clone())
            .await
        {
            Ok(peer) => peer,
            Err(e) => {
                error!(session = %self.session_id, error = %e, "failed to create peer connection");
                return;
            }
        };

        self.peer = Some(peer);
        self.role = Some(role);
        self.state = SessionState::Negotiating;
        info!(session = %self.session_id, %role, "peer connection started");

        if role == NegotiationRole::Offerer {
            self.send_offer().await;
        }
    }

    async fn send_offer(&mut self) {
        let Some(peer) = self.peer.clone() else {
            return;
        };

        let offer = match peer.create_offer().await {
            Ok(offer) => offer,
            Err(e) => {
                error!(session = %self.session_id, error = %e, "failed to create offer");
                return;
            }
        };
        if let Err(e) = peer.set_local_description(offer.clone()).await {
            error!(session = %self.session_id, error = %e, "failed to set local description");
            return;
        }
        self.send(SignalMessage::Sdp { sdp: offer });
    }

    /// Handle an incoming Sdp message: answer an offer, or accept an answer
    async fn handle_description(&mut self, sdp: SessionDescription) {
        let Some(peer) = self.peer.clone() else {
            warn!(session = %self.session_id, kind = %sdp.kind, "Sdp received with no peer connection");
            return;
        };

        match sdp.kind {
            SdpType::Offer => {
                if let Err(e) = peer.set_remote_description(sdp).await {
                    error!(session = %self.session_id, error = %e, "failed to set remote offer");
                    return;
                }
                let answer = match peer.create_answer().await {
                    Ok(answer) => answer,
                    Err(e) => {
                        error!(session = %self.session_id, error = %e, "failed to create answer");
                        return;
                    }
                };
                if let Err(e) = peer.set_local_description(answer.clone()).await {
                    error!(session = %self.session_id, error = %e, "failed to set local description");
                    return;
                }
                self.send(SignalMessage::Sdp { sdp: answer });
            }
            SdpType::Answer => {
                if let Err(e) = peer.set_remote_description(sdp).await {
                    error!(session = %self.session_id, error = %e, "failed to set remote answer");
                }
            }
        }
    }

    /// Apply a remote candidate now, or park it until the remote description
    /// exists
    async fn handle_candidate(&mut self, candidate: CandidateInit) {
        if let Some(peer) = self.peer.clone() {
            if peer.has_remote_description().await {
                if let Err(e) = peer.add_ice_candidate(candidate).await {
                    warn!(session = %self.session_id, error = %e, "failed to add ICE candidate");
                }
                return;
            }
        }

        self.pending.push(candidate);
        debug!(
            session = %self.session_id,
            queued = self.pending.len(),
            "remote description not set, candidate queued"
        );
    }

    /// Replay queued candidates once the remote description is available
    ///
    /// Explicit loop rather than recursive redispatch so a long queue cannot
    /// grow the stack. Each candidate is applied exactly once; an individual
    /// failure is logged and does not requeue the entry.
    async fn drain_pending(&mut self) {
        while !self.pending.is_empty() {
            let Some(peer) = self.peer.clone() else {
                break;
            };
            if !peer.has_remote_description().await {
                break;
            }
            let Some(candidate) = self.pending.pop() else {
                break;
            };
            if let Err(e) = peer.add_ice_candidate(candidate).await {
                warn!(session = %self.session_id, error = %e, "failed to apply queued candidate");
            }
        }
    }

    /// Forward an event from the peer connection
    pub async fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::Candidate(candidate) => {
                // Trickle immediately; no batching
                self.send(SignalMessage::Ice { candidate });
            }
            PeerEvent::Track { id, kind } => {
                info!(session = %self.session_id, track = %id, %kind, "remote track received");
            }
            PeerEvent::StateChanged(status) => {
                debug!(session = %self.session_id, %status, "peer connection state changed");
                match status {
                    PeerStatus::Connected => {
                        if self.state.can_transition_to(SessionState::Connected) {
                            self.state = SessionState::Connected;
                            info!(session = %self.session_id, "session connected");
                        }
                    }
                    PeerStatus::Failed | PeerStatus::Disconnected => {
                        warn!(session = %self.session_id, %status, "peer connection degraded");
                    }
                    _ => {}
                }
            }
        }
    }

    /// Tear the session down
    ///
    /// Every step runs even if an earlier one failed: broadcast Close (for a
    /// local stop), close the peer connection, stop the captured tracks,
    /// close the signaling link. Idempotent.
    pub async fn stop(&mut self, reason: CloseReason) {
        if self.state == SessionState::Closed {
            return;
        }
        info!(session = %self.session_id, ?reason, "stopping session");

        if reason == CloseReason::Local && self.outbound.send(SignalMessage::Close).is_err() {
            debug!(session = %self.session_id, "signaling link already gone, Close not sent");
        }

        if let Some(peer) = self.peer.take() {
            if let Err(e) = peer.close().await {
                warn!(session = %self.session_id, error = %e, "failed to close peer connection");
            }
        }

        if let Some(media) = self.media.take() {
            media.stop();
        }

        let _ = self.link_shutdown.send(true);

        self.pending.clear();
        self.role = None;
        self.state = SessionState::Closed;
    }

    fn send(&self, msg: SignalMessage) {
        if self.outbound.send(msg).is_err() {
            debug!(session = %self.session_id, "signaling link gone, outgoing message dropped");
        }
    }
}
