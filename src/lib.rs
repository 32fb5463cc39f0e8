//! Peercast - WebRTC negotiation demo client
//!
//! A Domain-Driven Design (DDD) implementation of a relay-mediated WebRTC
//! negotiation client, plus a single-process loopback variant that wires
//! two peer connections to each other directly.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::SessionError;
pub use domain::shared::result::Result;
