//! Peer connection plumbing

pub mod peer;

pub use peer::{RtcPeer, RtcPeerFactory};
