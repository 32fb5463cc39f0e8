//! Ports to the capture and peer-connection subsystems
//!
//! The browser-equivalent capabilities (media capture, peer negotiation) are
//! external collaborators; the controllers only speak to them through these
//! traits so the dispatch logic stays testable without network or devices.

use crate::domain::session::NegotiationRole;
use crate::domain::shared::result::Result;
use crate::domain::signaling::{CandidateInit, SessionDescription};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Connection status reported by a peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerStatus::New => write!(f, "new"),
            PeerStatus::Connecting => write!(f, "connecting"),
            PeerStatus::Connected => write!(f, "connected"),
            PeerStatus::Disconnected => write!(f, "disconnected"),
            PeerStatus::Failed => write!(f, "failed"),
            PeerStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Event emitted by a peer connection
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// A local ICE candidate was discovered (trickle it to the remote side)
    Candidate(CandidateInit),
    /// A remote media track arrived
    Track { id: String, kind: String },
    /// The connection status changed
    StateChanged(PeerStatus),
}

/// One peer connection's negotiation surface
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MediaPeer: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: CandidateInit) -> Result<()>;

    /// Whether a remote description has been applied yet
    async fn has_remote_description(&self) -> bool;

    async fn close(&self) -> Result<()>;
}

/// Creates peer connections with observers wired to the given event channel
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PeerFactory: Send + Sync {
    async fn create_peer(
        &self,
        role: NegotiationRole,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Arc<dyn MediaPeer>>;
}

/// Handle to the locally captured media stream owned by a session
///
/// `stop` must be idempotent; the session calls it exactly once per teardown
/// path but a handle may be shared with a preview surface.
#[cfg_attr(test, mockall::automock)]
pub trait LocalMedia: Send + Sync {
    fn stop(&self);

    fn is_stopped(&self) -> bool;
}
