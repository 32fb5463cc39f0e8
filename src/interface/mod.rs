//! Interface layer - signaling transport

pub mod link;

pub use link::SignalingLink;
