//! Shared domain primitives

pub mod error;
pub mod result;
pub mod value_objects;
