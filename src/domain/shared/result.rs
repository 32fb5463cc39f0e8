//! Shared result type

use crate::domain::shared::error::SessionError;

/// Session result type
pub type Result<T> = std::result::Result<T, SessionError>;
