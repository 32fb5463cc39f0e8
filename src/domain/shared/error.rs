//! Session errors

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Signaling error: {0}")]
    Signaling(String),

    #[error("Negotiation failed: {0}")]
    Negotiation(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("No active peer connection")]
    NoPeerConnection,

    #[error("Internal error: {0}")]
    Internal(String),
}
