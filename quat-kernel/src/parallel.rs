//! Fork-join kernel over contiguous partitions.
//!
//! Both phases split the batch with [`partition`] into one range per worker.
//! The multiply phase writes disjoint sub-views of `C`; the reduction phase
//! produces one partial sum per worker, and the partials are folded on the
//! calling thread in ascending worker order starting from zero. For a fixed
//! worker count the result is therefore deterministic, whatever the thread
//! scheduling.

use quat_view::{QuatBatch, Quaternion, Result};

use crate::kernel::{ensure_operands, BatchKernel, Strategy};
use crate::scalar::{multiply_view, self_reduce_view};
use crate::threading::{partition, WorkerPool};

/// Thread-parallel strategy with a fixed number of workers.
///
/// Works on either layout; each worker runs the scalar loop over its range.
#[derive(Debug)]
pub struct ParallelKernel {
    pool: WorkerPool,
}

impl ParallelKernel {
    pub fn new(workers: usize) -> Result<Self> {
        Ok(Self {
            pool: WorkerPool::new(workers)?,
        })
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// One partial `Σ C[i] ⊗ C[i]` per worker, indexed by worker.
    pub fn self_reduce_partials(&self, c: &QuatBatch) -> Vec<Quaternion> {
        let view = c.view();
        let parts: Vec<_> = partition(c.len(), self.workers())
            .into_iter()
            .map(|r| view.slice(r))
            .collect();
        tracing::debug!(workers = parts.len(), len = c.len(), "reduction partitioned");
        self.pool
            .map_ordered(parts, |_, part| self_reduce_view(&part))
    }
}

/// Fold per-worker partials in index order, starting from zero.
pub fn combine_partials(partials: &[Quaternion]) -> Quaternion {
    partials.iter().fold(Quaternion::ZERO, |acc, &p| acc + p)
}

impl BatchKernel for ParallelKernel {
    fn strategy(&self) -> Strategy {
        Strategy::Parallel
    }

    fn multiply_into(&self, a: &QuatBatch, b: &QuatBatch, c: &mut QuatBatch) -> Result<()> {
        ensure_operands(a, b, c, None)?;
        let ranges = partition(c.len(), self.workers());
        let (a, b) = (a.view(), b.view());
        let parts = c.view_mut().split_ranges(&ranges);
        let jobs: Vec<_> = ranges.into_iter().zip(parts).collect();
        self.pool.map_ordered(jobs, |_, (range, mut dst)| {
            multiply_view(&a.slice(range.clone()), &b.slice(range), &mut dst);
        });
        Ok(())
    }

    fn self_reduce(&self, c: &QuatBatch) -> Result<Quaternion> {
        let partials = self.self_reduce_partials(c);
        tracing::trace!(?partials, "per-worker partial sums");
        Ok(combine_partials(&partials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarKernel;
    use crate::tolerance::Agreement;
    use quat_view::{Layout, QuatError};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            ParallelKernel::new(0),
            Err(QuatError::InvalidWorkerCount(0))
        ));
    }

    #[test]
    fn test_multiply_bit_identical_to_scalar() {
        let mut rng = StdRng::seed_from_u64(21);
        for layout in [Layout::Interleaved, Layout::Planar] {
            let a = QuatBatch::random(1000, layout, &mut rng).unwrap();
            let b = QuatBatch::random(1000, layout, &mut rng).unwrap();
            let mut expected = QuatBatch::zeroed(1000, layout).unwrap();
            ScalarKernel.multiply_into(&a, &b, &mut expected).unwrap();
            for workers in [1, 3, 4, 7] {
                let kernel = ParallelKernel::new(workers).unwrap();
                let mut c = QuatBatch::zeroed(1000, layout).unwrap();
                kernel.multiply_into(&a, &b, &mut c).unwrap();
                assert_eq!(c.to_vec(), expected.to_vec(), "{layout} T={workers}");
            }
        }
    }

    #[test]
    fn test_single_worker_matches_scalar_exactly() {
        let mut rng = StdRng::seed_from_u64(8);
        let c = QuatBatch::random(517, Layout::Planar, &mut rng).unwrap();
        let kernel = ParallelKernel::new(1).unwrap();
        assert_eq!(
            kernel.self_reduce(&c).unwrap(),
            ScalarKernel.self_reduce(&c).unwrap()
        );
    }

    #[test]
    fn test_reduce_deterministic_and_bounded() {
        let mut rng = StdRng::seed_from_u64(99);
        let c = QuatBatch::random(1000, Layout::Interleaved, &mut rng).unwrap();
        let agreement = Agreement::of(&c);
        for workers in [2, 3, 4, 8] {
            let kernel = ParallelKernel::new(workers).unwrap();
            let first = kernel.self_reduce(&c).unwrap();
            for _ in 0..5 {
                assert_eq!(kernel.self_reduce(&c).unwrap(), first, "T={workers}");
            }
            assert!(agreement.accepts(&first), "T={workers}: {first}");
        }
    }

    #[test]
    fn test_partials_combine_in_worker_order() {
        let quats: Vec<_> = (1..=6)
            .map(|i| Quaternion::new(i as f32, 0.0, 0.0, 0.0))
            .collect();
        let c = QuatBatch::from_quaternions(&quats, Layout::Planar).unwrap();
        let kernel = ParallelKernel::new(4).unwrap();
        let partials = kernel.self_reduce_partials(&c);
        // ranges 0..2, 2..4, 4..5, 5..6
        let w: Vec<f32> = partials.iter().map(|p| p.w).collect();
        assert_eq!(w, vec![1.0 + 4.0, 9.0 + 16.0, 25.0, 36.0]);
        assert_eq!(combine_partials(&partials).w, 91.0);
    }

    #[test]
    fn test_more_workers_than_quaternions() {
        let b = Quaternion::new(2.0, 3.0, 4.0, 5.0);
        let a = QuatBatch::from_quaternions(&[Quaternion::IDENTITY; 2], Layout::Interleaved)
            .unwrap();
        let bb = QuatBatch::from_quaternions(&[b; 2], Layout::Interleaved).unwrap();
        let mut c = QuatBatch::zeroed(2, Layout::Interleaved).unwrap();
        let kernel = ParallelKernel::new(6).unwrap();
        let r = kernel.run(&a, &bb, &mut c).unwrap();
        assert_eq!(c.to_vec(), vec![b, b]);
        assert_eq!(r, Quaternion::new(-92.0, 24.0, 32.0, 40.0));
        assert_eq!(kernel.self_reduce_partials(&c).len(), 6);
    }
}
