//! Application layer - negotiation orchestration

pub mod loopback;
pub mod negotiation;
pub mod ports;

pub use loopback::LoopbackController;
pub use negotiation::{CloseReason, NegotiationController};
pub use ports::{LocalMedia, MediaPeer, PeerEvent, PeerFactory, PeerStatus};
