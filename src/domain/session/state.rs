//! Session state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Negotiation session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No peer connection exists yet
    Idle,
    /// A peer connection exists and descriptions/candidates are being exchanged
    Negotiating,
    /// The peer connection reported itself connected
    Connected,
    /// The session was torn down; terminal
    Closed,
}

impl SessionState {
    /// Check if a state transition is valid
    pub fn can_transition_to(&self, new_state: SessionState) -> bool {
        use SessionState::*;

        match (self, new_state) {
            (Idle, Negotiating) => true,
            // A fresh Offer/Answer role assignment restarts negotiation
            (Negotiating, Negotiating) => true,
            (Negotiating, Connected) => true,
            (Connected, Negotiating) => true,

            (Idle, Closed) => true,
            (Negotiating, Closed) => true,
            (Connected, Closed) => true,

            // Closed is terminal; a new session object must be created
            (Closed, _) => false,

            _ => false,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Negotiating => write!(f, "negotiating"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Which side of the offer/answer exchange a peer connection plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationRole {
    Offerer,
    Answerer,
}

impl fmt::Display for NegotiationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationRole::Offerer => write!(f, "offerer"),
            NegotiationRole::Answerer => write!(f, "answerer"),
        }
    }
}
