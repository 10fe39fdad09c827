//! "Latest request wins" bookkeeping.
//!
//! When the user changes the selected watershed while a query for the
//! previous one is still in flight, the older response must not overwrite
//! the newer one. Each request takes a ticket; only the most recently
//! issued ticket is current.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic generation counter.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    current: AtomicU64,
}

/// Handle for one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, superseding every earlier ticket.
    pub fn begin(&self) -> RequestTicket {
        RequestTicket(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.current.load(Ordering::Acquire) == ticket.0
    }

    /// Supersede all outstanding tickets without starting a request.
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_latest_wins() {
        let generation = RequestGeneration::new();
        let a = generation.begin();
        assert!(generation.is_current(a));
        let b = generation.begin();
        assert!(!generation.is_current(a));
        assert!(generation.is_current(b));
        assert!(b > a);
    }

    #[test]
    fn test_invalidate() {
        let generation = RequestGeneration::new();
        let a = generation.begin();
        generation.invalidate();
        assert!(!generation.is_current(a));
    }

    #[test]
    fn test_concurrent_tickets_are_unique() {
        let counter = Arc::new(RequestGeneration::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || (0..100).map(|_| counter.begin().id()).collect::<Vec<_>>())
            })
            .collect();
        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 800);
        assert!(counter.is_current(RequestTicket(800)));
    }
}
