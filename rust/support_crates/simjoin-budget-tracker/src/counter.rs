use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe amount that never goes below zero.
///
/// Withdrawals either take the full requested amount or leave the counter untouched.
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new(amount: u64) -> Counter {
        Counter(AtomicU64::new(amount))
    }

    /// Attempts to take `amount` from the counter.
    ///
    /// Returns `false` (and leaves the counter unchanged) when fewer than `amount`
    /// units remain.
    pub fn withdraw(&self, amount: u64) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |current| {
                current.checked_sub(amount)
            })
            .is_ok()
    }

    pub fn deposit(&self, amount: u64) {
        self.0.fetch_add(amount, Ordering::Release);
    }

    /// Returns the counter value (most likely stale by the time it is observed by the caller).
    pub fn read(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
