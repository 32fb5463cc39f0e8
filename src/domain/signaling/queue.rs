//! Pending-candidate queue
//!
//! Holds ICE candidates that arrived before the remote description was set.
//! Invariant: once the remote description is available, the dispatcher drains
//! this queue in strict arrival order before handling anything new, so the
//! queue is never left non-empty with a remote description in place.

use crate::domain::signaling::message::CandidateInit;
use std::collections::VecDeque;

/// FIFO of not-yet-applicable ICE candidates
#[derive(Debug, Default)]
pub struct PendingCandidateQueue {
    entries: VecDeque<CandidateInit>,
}

impl PendingCandidateQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Append a candidate that cannot be applied yet
    pub fn push(&mut self, candidate: CandidateInit) {
        self.entries.push_back(candidate);
    }

    /// Remove and return the oldest queued candidate
    pub fn pop(&mut self) -> Option<CandidateInit> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discard all queued candidates (new peer connection, teardown)
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
