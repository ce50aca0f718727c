//! Memory budget accounting for state that must be fully materialized before
//! parallel work can start (published join state, indexes, lookup maps).
//!
//! A [`Budget`] holds a fixed amount. [`Allocation`]s withdraw from it and give the
//! amount back when dropped, so a budget always reflects the state that is still alive.

use std::sync::Arc;

use counter::Counter;

pub mod counter;

/// Represents a budget that can be allocated from.
#[derive(Clone)]
pub struct Budget(Arc<BudgetNode>);

impl Budget {
    /// Creates a new root budget with the given amount.
    pub fn new(amount: u64) -> Budget {
        Budget(Arc::new(BudgetNode {
            limit: amount,
            remaining: Counter::new(amount),
        }))
    }

    /// Creates a budget that never refuses an allocation.
    pub fn unlimited() -> Budget {
        Budget::new(u64::MAX)
    }

    /// The amount this budget was created with.
    pub fn limit(&self) -> u64 {
        self.0.limit
    }

    /// Returns the remaining amount in this budget tracker.
    ///
    /// **Note**: This method is primarily intended for diagnostic purposes. The returned
    /// value may be outdated in a concurrent environment.
    pub fn remaining(&self) -> u64 {
        self.0.remaining.read()
    }

    /// Attempts to allocate the specified amount from the budget.
    ///
    /// The allocated amount is automatically returned to the `Budget` when the
    /// `Allocation` is dropped.
    pub fn allocate(&self, amount: u64) -> Result<Allocation, AllocationError> {
        if self.0.allocate(amount) {
            Ok(Allocation {
                budget: self.0.clone(),
                amount,
            })
        } else {
            Err(AllocationError)
        }
    }
}

impl std::fmt::Debug for Budget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Budget")
            .field("limit", &self.limit())
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// Represents an allocation from a budget.
///
/// When the allocation is dropped, the allocated amount is returned to the budget.
pub struct Allocation {
    budget: Arc<BudgetNode>,
    amount: u64,
}

impl Allocation {
    /// Currently allocated amount.
    pub fn amount(&self) -> u64 {
        self.amount
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        if self.amount != 0 {
            self.budget.release(self.amount);
        }
    }
}

impl std::fmt::Debug for Allocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Allocation")
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}

/// An error that occurs when a budget allocation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocationError;

impl std::fmt::Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Budget allocation error")
    }
}

impl std::error::Error for AllocationError {}

struct BudgetNode {
    limit: u64,
    remaining: Counter,
}

impl BudgetNode {
    fn allocate(&self, amount: u64) -> bool {
        amount == 0 || self.remaining.withdraw(amount)
    }

    fn release(&self, amount: u64) {
        self.remaining.deposit(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_creation() {
        let budget = Budget::new(100);
        assert_eq!(budget.remaining(), 100);
        assert_eq!(budget.limit(), 100);
    }

    #[test]
    fn test_allocate_failure() {
        let budget = Budget::new(100);
        let result = budget.allocate(150);
        assert_eq!(result.unwrap_err(), AllocationError);
        assert_eq!(budget.remaining(), 100);
    }

    #[test]
    fn test_allocation_drop() {
        let budget = Budget::new(100);
        {
            let allocation = budget.allocate(50).unwrap();
            assert_eq!(allocation.amount(), 50);
            assert_eq!(budget.remaining(), 50);
        }
        assert_eq!(budget.remaining(), 100);
    }

    #[test]
    fn test_unlimited() {
        let budget = Budget::unlimited();
        let _a = budget.allocate(u64::MAX / 2).unwrap();
        let _b = budget.allocate(u64::MAX / 4).unwrap();
    }
}
