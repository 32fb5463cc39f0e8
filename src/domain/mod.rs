//! Domain layer - pure negotiation model

pub mod session;
pub mod shared;
pub mod signaling;
