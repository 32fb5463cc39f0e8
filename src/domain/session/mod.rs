//! Session bounded context - lifecycle of one negotiation attempt

pub mod state;

pub use state::{NegotiationRole, SessionState};
