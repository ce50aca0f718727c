//! Read-only state published to every worker.

use std::{
    collections::{HashMap, HashSet},
    hash::BuildHasher,
    mem::size_of,
    ops::Deref,
    sync::Arc,
};

use ahash::{AHashMap, AHashSet};
use simjoin_budget_tracker::Allocation;

/// An immutable snapshot shared by all workers of an execution context.
///
/// Created once by [`ExecutionContext::broadcast`](crate::ExecutionContext::broadcast)
/// and never mutated afterwards. Cloning is cheap; all clones share the same value and
/// the same budget allocation, which is released when the last clone is dropped.
pub struct Broadcast<T> {
    inner: Arc<BroadcastInner<T>>,
}

struct BroadcastInner<T> {
    value: T,
    allocation: Allocation,
}

impl<T> Broadcast<T> {
    pub(crate) fn new(value: T, allocation: Allocation) -> Broadcast<T> {
        Broadcast {
            inner: Arc::new(BroadcastInner { value, allocation }),
        }
    }

    pub fn value(&self) -> &T {
        &self.inner.value
    }

    /// Number of budget bytes held by this snapshot.
    pub fn charged_size(&self) -> u64 {
        self.inner.allocation.amount()
    }
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Broadcast {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Deref for Broadcast<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Broadcast<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcast")
            .field("value", &self.inner.value)
            .field("charged_size", &self.charged_size())
            .finish()
    }
}

/// Approximate memory footprint of a value, used to charge the broadcast budget.
///
/// The estimate does not need to be exact, but it must grow with the amount of data
/// held by the value.
pub trait EstimateSize {
    /// Bytes owned on the heap by this value (excluding its inline size).
    fn heap_size(&self) -> u64;

    /// Inline size plus heap size.
    fn estimated_size(&self) -> u64
    where
        Self: Sized,
    {
        size_of::<Self>() as u64 + self.heap_size()
    }
}

macro_rules! impl_estimate_size_inline {
    ($($t:ty),*) => {
        $(
            impl EstimateSize for $t {
                #[inline]
                fn heap_size(&self) -> u64 {
                    0
                }
            }
        )*
    };
}

impl_estimate_size_inline!(bool, u8, u16, u32, u64, usize, i32, i64, f32, f64);

impl EstimateSize for String {
    fn heap_size(&self) -> u64 {
        self.capacity() as u64
    }
}

impl EstimateSize for str {
    fn heap_size(&self) -> u64 {
        0
    }
}

impl<T: EstimateSize + ?Sized> EstimateSize for Arc<T> {
    fn heap_size(&self) -> u64 {
        std::mem::size_of_val(self.as_ref()) as u64 + self.as_ref().heap_size()
    }
}

impl<T: EstimateSize> EstimateSize for Option<T> {
    fn heap_size(&self) -> u64 {
        self.as_ref().map_or(0, EstimateSize::heap_size)
    }
}

impl<T: EstimateSize> EstimateSize for Vec<T> {
    fn heap_size(&self) -> u64 {
        (self.capacity() * size_of::<T>()) as u64
            + self.iter().map(EstimateSize::heap_size).sum::<u64>()
    }
}

impl<A: EstimateSize, B: EstimateSize> EstimateSize for (A, B) {
    fn heap_size(&self) -> u64 {
        self.0.heap_size() + self.1.heap_size()
    }
}

impl<K, V, S> EstimateSize for HashMap<K, V, S>
where
    K: EstimateSize,
    V: EstimateSize,
    S: BuildHasher,
{
    fn heap_size(&self) -> u64 {
        // One control byte per bucket on top of the slot itself.
        (self.capacity() * (size_of::<(K, V)>() + 1)) as u64
            + self
                .iter()
                .map(|(k, v)| k.heap_size() + v.heap_size())
                .sum::<u64>()
    }
}

impl<K, S> EstimateSize for HashSet<K, S>
where
    K: EstimateSize,
    S: BuildHasher,
{
    fn heap_size(&self) -> u64 {
        (self.capacity() * (size_of::<K>() + 1)) as u64
            + self.iter().map(EstimateSize::heap_size).sum::<u64>()
    }
}

impl<K: EstimateSize, V: EstimateSize> EstimateSize for AHashMap<K, V> {
    fn heap_size(&self) -> u64 {
        (**self).heap_size()
    }
}

impl<K: EstimateSize> EstimateSize for AHashSet<K> {
    fn heap_size(&self) -> u64 {
        (**self).heap_size()
    }
}
