//! Signaling wire messages
//!
//! JSON objects exchanged over the relay. Every message carries an `action`
//! field; `Sdp` and `Ice` additionally carry their negotiation payload.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a session description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdpType::Offer => write!(f, "offer"),
            SdpType::Answer => write!(f, "answer"),
        }
    }
}

/// A proposed or agreed session description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A trickled ICE candidate, in the browser's JSON shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInit {
    pub candidate: String,
    #[serde(rename = "sdpMid", skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u16>,
    #[serde(rename = "usernameFragment", skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl CandidateInit {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
            username_fragment: None,
        }
    }
}

/// Signaling message exchanged with the relay
///
/// `Offer` and `Answer` are role assignments from the relay (start a peer
/// connection as offerer or answerer); `Sdp` and `Ice` carry the actual
/// negotiation payloads; `Ping`/`Pong` is the liveness pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum SignalMessage {
    Open,
    Close,
    Offer,
    Answer,
    Sdp { sdp: SessionDescription },
    Ice { candidate: CandidateInit },
    Ping,
    Pong,
}

impl SignalMessage {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::Open => "Open",
            SignalMessage::Close => "Close",
            SignalMessage::Offer => "Offer",
            SignalMessage::Answer => "Answer",
            SignalMessage::Sdp { .. } => "Sdp",
            SignalMessage::Ice { .. } => "Ice",
            SignalMessage::Ping => "Ping",
            SignalMessage::Pong => "Pong",
        }
    }
}
