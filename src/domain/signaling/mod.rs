//! Signaling bounded context - wire messages and candidate queuing

pub mod message;
pub mod queue;

pub use message::{CandidateInit, SdpType, SessionDescription, SignalMessage};
pub use queue::PendingCandidateQueue;
