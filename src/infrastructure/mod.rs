//! Infrastructure layer - media and peer connection implementations

pub mod media;
pub mod webrtc;
