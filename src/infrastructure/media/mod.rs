//! Media capture

pub mod capture;

pub use capture::{MediaStream, SyntheticCapture};
