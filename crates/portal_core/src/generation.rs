//! Request generation tokens.
//!
//! A flow that re-issues queries when its input changes (wallet address,
//! active chain) takes a ticket before each request and checks it when the
//! response lands. Responses carrying an outdated ticket are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic generation counter shared by clones.
#[derive(Debug, Clone, Default)]
pub struct RequestGeneration {
    current: Arc<AtomicU64>,
}

/// Snapshot of the generation at the time a request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GenerationTicket(u64);

impl GenerationTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, invalidating every earlier ticket.
    pub fn advance(&self) -> GenerationTicket {
        GenerationTicket(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Ticket for the current generation without advancing it.
    pub fn current(&self) -> GenerationTicket {
        GenerationTicket(self.current.load(Ordering::Acquire))
    }

    pub fn is_current(&self, ticket: GenerationTicket) -> bool {
        self.current.load(Ordering::Acquire) == ticket.0
    }
}
