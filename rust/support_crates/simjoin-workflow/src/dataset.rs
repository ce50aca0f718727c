//! Immutable partitioned collections.
//!
//! A [`Dataset`] is split into partitions when it is created (see
//! [`ExecutionContext::parallelize`]). Per-element transformations run independently
//! per partition on the context's worker pool; keyed aggregations combine within
//! each partition first and merge the partial results on the calling thread.

use std::{
    hash::Hash,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use ahash::AHashMap;
use simjoin_common::Result;

use crate::context::ExecutionContext;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_source_id() -> u64 {
    NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Immutable partitioned collection.
///
/// Cloning a dataset is cheap and yields the *same* dataset: clones share the
/// partitions and the source id (see [`Dataset::same_source`]). Every transformation
/// produces a new dataset with a fresh source id.
pub struct Dataset<T> {
    ctx: Arc<ExecutionContext>,
    source_id: u64,
    partitions: Arc<Vec<Vec<T>>>,
}

impl<T> Clone for Dataset<T> {
    fn clone(&self) -> Self {
        Dataset {
            ctx: Arc::clone(&self.ctx),
            source_id: self.source_id,
            partitions: Arc::clone(&self.partitions),
        }
    }
}

impl<T> Dataset<T> {
    pub(crate) fn from_partitions(ctx: Arc<ExecutionContext>, partitions: Vec<Vec<T>>) -> Self {
        Dataset {
            ctx,
            source_id: next_source_id(),
            partitions: Arc::new(partitions),
        }
    }

    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.ctx
    }

    /// Identity of the data this dataset was created from.
    pub fn source_id(&self) -> u64 {
        self.source_id
    }

    /// Returns `true` when both handles refer to the same collection.
    pub fn same_source<U>(&self, other: &Dataset<U>) -> bool {
        self.source_id == other.source_id
    }

    pub fn partitions(&self) -> &[Vec<T>] {
        &self.partitions
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Number of elements across all partitions.
    pub fn count(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(Vec::is_empty)
    }

    /// Iterates over all elements, partition by partition.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.partitions.iter().flatten()
    }
}

impl<T: Send + Sync> Dataset<T> {
    /// Transforms every partition with `f`, keeping the partitioning.
    pub fn map_partitions<R, F>(&self, f: F) -> Dataset<R>
    where
        R: Send,
        F: Fn(&[T]) -> Vec<R> + Send + Sync,
    {
        let partitions = self.run_partitions(|part| f(part));
        Dataset::from_partitions(Arc::clone(&self.ctx), partitions)
    }

    /// Fallible variant of [`Dataset::map_partitions`].
    ///
    /// # Errors
    /// Returns the first error produced by any partition; no partial result is kept.
    pub fn try_map_partitions<R, F>(&self, f: F) -> Result<Dataset<R>>
    where
        R: Send,
        F: Fn(&[T]) -> Result<Vec<R>> + Send + Sync,
    {
        let partitions = self
            .run_partitions(|part| f(part))
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        Ok(Dataset::from_partitions(Arc::clone(&self.ctx), partitions))
    }

    pub fn map<R, F>(&self, f: F) -> Dataset<R>
    where
        R: Send,
        F: Fn(&T) -> R + Send + Sync,
    {
        self.map_partitions(|part| part.iter().map(&f).collect())
    }

    pub fn flat_map<R, I, F>(&self, f: F) -> Dataset<R>
    where
        R: Send,
        I: IntoIterator<Item = R>,
        F: Fn(&T) -> I + Send + Sync,
    {
        self.map_partitions(|part| part.iter().flat_map(&f).collect())
    }

    pub fn filter<F>(&self, f: F) -> Dataset<T>
    where
        T: Clone,
        F: Fn(&T) -> bool + Send + Sync,
    {
        self.map_partitions(|part| part.iter().filter(|item| f(item)).cloned().collect())
    }

    /// Pairs every element with an id that is unique across all partitions.
    ///
    /// Ids are dense (`0..count`) and follow the partition order: every partition
    /// numbers its elements starting at the total size of the partitions before it.
    pub fn zip_with_unique_id(&self) -> Dataset<(u64, T)>
    where
        T: Clone,
    {
        let offsets = self
            .partitions
            .iter()
            .scan(0u64, |offset, part| {
                let start = *offset;
                *offset += part.len() as u64;
                Some(start)
            })
            .collect::<Vec<_>>();
        let partitions = self.ctx.run(
            offsets.into_iter().enumerate().collect::<Vec<_>>(),
            |(index, offset)| {
                self.partitions[index]
                    .iter()
                    .zip(offset..)
                    .map(|(item, id)| (id, item.clone()))
                    .collect::<Vec<_>>()
            },
        );
        Dataset::from_partitions(Arc::clone(&self.ctx), partitions)
    }

    /// Aggregates `(key, value)` pairs emitted by `f` into a single map.
    ///
    /// Values sharing a key are combined with `merge`, first within each partition and
    /// then across partitions. `merge` must be associative and commutative.
    pub fn reduce_by_key<K, V, I, F, M>(&self, f: F, merge: M) -> AHashMap<K, V>
    where
        K: Eq + Hash + Send,
        V: Send,
        I: IntoIterator<Item = (K, V)>,
        F: Fn(&T) -> I + Send + Sync,
        M: Fn(&mut V, V) + Send + Sync,
    {
        let partials = self.run_partitions(|part| {
            let mut local = AHashMap::new();
            for (key, value) in part.iter().flat_map(&f) {
                combine(&mut local, key, value, &merge);
            }
            local
        });

        let mut partials = partials.into_iter();
        let mut result = partials.next().unwrap_or_default();
        for partial in partials {
            for (key, value) in partial {
                combine(&mut result, key, value, &merge);
            }
        }
        result
    }

    /// Groups the `(key, value)` pairs emitted by `f` by key.
    ///
    /// Value order within a group is unspecified.
    pub fn group_by_key<K, V, I, F>(&self, f: F) -> AHashMap<K, Vec<V>>
    where
        K: Eq + Hash + Send,
        V: Send,
        I: IntoIterator<Item = (K, V)>,
        F: Fn(&T) -> I + Send + Sync,
    {
        self.reduce_by_key(
            |item| f(item).into_iter().map(|(key, value)| (key, vec![value])),
            |acc, mut values| acc.append(&mut values),
        )
    }

    /// Applies `f` to every pair of the cartesian product `self × other` and keeps
    /// the `Some` results.
    ///
    /// Each pair of partitions is processed as one task, so the product is never
    /// materialized as a whole.
    pub fn cartesian_filter_map<U, R, F>(&self, other: &Dataset<U>, f: F) -> Dataset<R>
    where
        U: Send + Sync,
        R: Send,
        F: Fn(&T, &U) -> Option<R> + Send + Sync,
    {
        let tasks = (0..self.num_partitions())
            .flat_map(|left| (0..other.num_partitions()).map(move |right| (left, right)))
            .collect::<Vec<_>>();
        log::trace!(
            "cartesian: {} x {} partitions, {} tasks",
            self.num_partitions(),
            other.num_partitions(),
            tasks.len()
        );
        let f = &f;
        let partitions = self.ctx.run(tasks, |(left, right)| {
            let right = &other.partitions[right];
            self.partitions[left]
                .iter()
                .flat_map(|l| right.iter().filter_map(move |r| f(l, r)))
                .collect::<Vec<_>>()
        });
        Dataset::from_partitions(Arc::clone(&self.ctx), partitions)
    }

    /// Concatenates the partitions of both datasets.
    pub fn union(&self, other: &Dataset<T>) -> Dataset<T>
    where
        T: Clone,
    {
        let partitions = self
            .partitions
            .iter()
            .chain(other.partitions.iter())
            .cloned()
            .collect();
        Dataset::from_partitions(Arc::clone(&self.ctx), partitions)
    }

    /// Copies all elements into a vector, in partition order.
    pub fn collect(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Moves all elements into a vector, in partition order. Copies only when the
    /// partitions are shared with another handle.
    pub fn into_vec(self) -> Vec<T>
    where
        T: Clone,
    {
        match Arc::try_unwrap(self.partitions) {
            Ok(partitions) => partitions.into_iter().flatten().collect(),
            Err(shared) => shared.iter().flatten().cloned().collect(),
        }
    }

    fn run_partitions<R, F>(&self, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(&[T]) -> R + Send + Sync,
    {
        let partitions = self.partitions.as_slice();
        self.ctx
            .run((0..partitions.len()).collect(), |index| {
                f(partitions[index].as_slice())
            })
    }
}

impl<T: Clone + Send + Sync> IntoIterator for Dataset<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Dataset<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("source_id", &self.source_id)
            .field("partitions", &self.partitions)
            .finish()
    }
}

fn combine<K, V, M>(map: &mut AHashMap<K, V>, key: K, value: V, merge: &M)
where
    K: Eq + Hash,
    M: Fn(&mut V, V),
{
    match map.entry(key) {
        std::collections::hash_map::Entry::Occupied(mut entry) => merge(entry.get_mut(), value),
        std::collections::hash_map::Entry::Vacant(entry) => {
            entry.insert(value);
        }
    }
}
