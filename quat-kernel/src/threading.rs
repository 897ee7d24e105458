//! Work partitioning and the fixed-size worker pool.
//!
//! A batch of `n` quaternions is cut into `T` contiguous index ranges, one per
//! worker. With the `parallel` feature each range becomes a task on a dedicated
//! rayon pool of exactly `T` threads; without it the ranges run one after the
//! other on the calling thread. Results always come back in ascending
//! partition order, so anything folded from them is independent of scheduling.

use std::ops::Range;

use quat_view::{QuatError, Result};
use smallvec::SmallVec;

/// Partition list; inline for typical core counts.
pub type Partition = SmallVec<[Range<usize>; 8]>;

/// Split `0..len` into `workers` contiguous ranges.
///
/// The first `len % workers` ranges get one extra element. When
/// `workers > len` the trailing ranges are empty but still present, so the
/// result always has exactly `workers` entries.
pub fn partition(len: usize, workers: usize) -> Partition {
    let mut out = Partition::new();
    if workers == 0 {
        return out;
    }
    let base = len / workers;
    let extra = len % workers;
    let mut start = 0;
    for k in 0..workers {
        let size = base + usize::from(k < extra);
        out.push(start..start + size);
        start += size;
    }
    debug_assert_eq!(start, len);
    out
}

/// Fixed-size pool of worker threads.
pub struct WorkerPool {
    workers: usize,
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Pool with exactly `workers` threads.
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(QuatError::InvalidWorkerCount(workers));
        }
        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("quat-worker-{i}"))
            .build()
            .map_err(|e| QuatError::ThreadPool(e.to_string()))?;
        tracing::debug!(workers, "worker pool ready");
        Ok(Self {
            workers,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `f(k, item)` for every item, one task per item, and return the
    /// results in item order. Blocks until every task has finished.
    #[cfg(feature = "parallel")]
    pub fn map_ordered<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(usize, T) -> R + Sync,
    {
        use rayon::prelude::*;

        self.pool.install(|| {
            items
                .into_par_iter()
                .with_max_len(1)
                .enumerate()
                .map(|(k, item)| f(k, item))
                .collect()
        })
    }

    /// Sequential fallback: same contract, run on the calling thread.
    #[cfg(not(feature = "parallel"))]
    pub fn map_ordered<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(usize, T) -> R + Sync,
    {
        items
            .into_iter()
            .enumerate()
            .map(|(k, item)| f(k, item))
            .collect()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_even() {
        let p = partition(12, 4);
        assert_eq!(p.as_slice(), &[0..3, 3..6, 6..9, 9..12]);
    }

    #[test]
    fn test_partition_remainder_goes_first() {
        let p = partition(10, 4);
        assert_eq!(p.as_slice(), &[0..3, 3..6, 6..8, 8..10]);
    }

    #[test]
    fn test_partition_more_workers_than_items() {
        let p = partition(3, 5);
        assert_eq!(p.len(), 5);
        assert_eq!(p.as_slice(), &[0..1, 1..2, 2..3, 3..3, 3..3]);
    }

    #[test]
    fn test_partition_covers_exactly() {
        for n in [1usize, 7, 100, 1001] {
            for t in 1..=9 {
                let p = partition(n, t);
                assert_eq!(p.len(), t);
                assert_eq!(p[0].start, 0);
                assert_eq!(p[t - 1].end, n);
                for w in p.windows(2) {
                    assert_eq!(w[0].end, w[1].start);
                    assert!(w[0].len() >= w[1].len());
                    assert!(w[0].len() - w[1].len() <= 1);
                }
            }
        }
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(QuatError::InvalidWorkerCount(0))
        ));
        assert!(partition(10, 0).is_empty());
    }

    #[test]
    fn test_map_ordered_preserves_order() {
        let pool = WorkerPool::new(3).unwrap();
        assert_eq!(pool.workers(), 3);
        let out = pool.map_ordered((0..20).collect(), |k, v: usize| {
            assert_eq!(k, v);
            v * v
        });
        assert_eq!(out, (0..20).map(|v| v * v).collect::<Vec<_>>());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_pool_threads_are_named() {
        let pool = WorkerPool::new(2).unwrap();
        let names = pool.map_ordered(vec![(), ()], |_, _| {
            std::thread::current().name().map(str::to_owned)
        });
        for name in names {
            assert!(name.unwrap().starts_with("quat-worker-"));
        }
    }
}
