//! Execution context: worker pool, partitioning policy and memory budget.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use simjoin_budget_tracker::Budget;
use simjoin_common::{Result, error::Error, verify_arg};

use crate::{
    broadcast::{Broadcast, EstimateSize},
    dataset::Dataset,
};

/// Configuration parameters for an [`ExecutionContext`].
///
/// Every field is optional; the accessor methods resolve the effective values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionParams {
    /// Maximum number of worker threads. `None` uses all available threads.
    /// A value of 1 forces sequential execution on the calling thread.
    pub max_degree: Option<usize>,

    /// Number of partitions a collection is split into by
    /// [`ExecutionContext::parallelize`]. Defaults to twice the degree of
    /// parallelism, capped at `MAX_PARTITIONS_COUNT`.
    pub partitions_count: Option<usize>,

    /// Memory budget in bytes for state published through
    /// [`ExecutionContext::broadcast`]. By default, this parameter is set to 1GB.
    pub broadcast_memory_limit: Option<u64>,
}

impl ExecutionParams {
    /// Maximum allowed number of partitions to prevent excessive overhead.
    const MAX_PARTITIONS_COUNT: usize = 1024;

    /// Default memory budget for published state.
    const DEFAULT_BROADCAST_MEMORY_LIMIT: u64 = 1024 * 1024 * 1024; // 1 GB

    /// Parameters for single-threaded execution with a single partition.
    pub fn sequential() -> ExecutionParams {
        ExecutionParams {
            max_degree: Some(1),
            partitions_count: Some(1),
            broadcast_memory_limit: None,
        }
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }

    pub fn partitions_count(&self) -> usize {
        self.partitions_count
            .unwrap_or_else(|| self.max_degree() * 2)
            .clamp(1, Self::MAX_PARTITIONS_COUNT)
    }

    pub fn broadcast_memory_limit(&self) -> u64 {
        self.broadcast_memory_limit
            .unwrap_or(Self::DEFAULT_BROADCAST_MEMORY_LIMIT)
    }
}

/// The entry point to partitioned execution.
///
/// Holds the worker pool used by every [`Dataset`] created from this context and the
/// budget that bounds the size of published ([`Broadcast`]) state.
pub struct ExecutionContext {
    params: ExecutionParams,
    /// `None` when the effective degree of parallelism is 1.
    pool: Option<rayon::ThreadPool>,
    budget: Budget,
}

impl ExecutionContext {
    /// Creates a new execution context.
    ///
    /// # Errors
    /// Returns an error if the parameters are inconsistent or the worker pool cannot
    /// be created.
    pub fn new(params: ExecutionParams) -> Result<Arc<ExecutionContext>> {
        verify_arg!(max_degree, params.max_degree != Some(0));
        verify_arg!(partitions_count, params.partitions_count != Some(0));

        let max_degree = params.max_degree();
        let pool = if max_degree > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(max_degree)
                .thread_name(|i| format!("simjoin-worker-{i}"))
                .build()
                .map_err(|e| Error::worker_pool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };
        let budget = Budget::new(params.broadcast_memory_limit());
        log::debug!(
            "execution context: max_degree={max_degree}, partitions={}, broadcast_limit={}",
            params.partitions_count(),
            budget.limit()
        );
        Ok(Arc::new(ExecutionContext {
            params,
            pool,
            budget,
        }))
    }

    /// Creates a context that runs everything on the calling thread.
    pub fn sequential() -> Arc<ExecutionContext> {
        let params = ExecutionParams::sequential();
        let budget = Budget::new(params.broadcast_memory_limit());
        Arc::new(ExecutionContext {
            params,
            pool: None,
            budget,
        })
    }

    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    pub fn max_degree(&self) -> usize {
        self.params.max_degree()
    }

    pub fn partitions_count(&self) -> usize {
        self.params.partitions_count()
    }

    /// The budget charged by published state.
    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    /// Splits `items` into contiguous partitions of near-equal size.
    pub fn parallelize<T>(self: &Arc<Self>, items: Vec<T>) -> Dataset<T> {
        let total = items.len();
        let count = self.partitions_count().min(total).max(1);
        let base = total / count;
        let extra = total % count;

        let mut items = items.into_iter();
        let partitions = (0..count)
            .map(|i| {
                let len = base + usize::from(i < extra);
                items.by_ref().take(len).collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        log::trace!("parallelize: {total} items into {count} partitions");
        Dataset::from_partitions(Arc::clone(self), partitions)
    }

    /// Publishes `value` as a read-only snapshot shared by all workers.
    ///
    /// The estimated size of `value` is charged against the context budget until the
    /// last clone of the returned [`Broadcast`] is dropped.
    ///
    /// # Errors
    /// Returns a resource-exhausted error when the budget cannot hold the value.
    pub fn broadcast<T>(&self, name: &str, value: T) -> Result<Broadcast<T>>
    where
        T: EstimateSize + Send + Sync,
    {
        let size = value.estimated_size();
        let allocation = self
            .budget
            .allocate(size)
            .map_err(|_| Error::resource_exhausted(name, size, self.budget.remaining()))?;
        log::debug!("broadcast '{name}': {size} bytes published");
        Ok(Broadcast::new(value, allocation))
    }

    /// Applies `f` to every input, in parallel when the context has a worker pool and
    /// there is more than one input. Results keep the input order.
    pub(crate) fn run<T, R, F>(&self, inputs: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        match &self.pool {
            Some(pool) if inputs.len() > 1 => {
                pool.install(|| inputs.into_par_iter().map(&f).collect())
            }
            _ => inputs.into_iter().map(f).collect(),
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("params", &self.params)
            .field("parallel", &self.pool.is_some())
            .field("budget", &self.budget)
            .finish()
    }
}
