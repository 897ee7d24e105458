use approx::assert_relative_eq;
use quat_kernel::{
    kernel_for, layout_for, scalar, Agreement, BatchKernel, ParallelKernel, ScalarKernel,
    Strategy,
};
use quat_view::{Layout, QuatBatch, Quaternion};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn operands(n: usize, layout: Layout, seed: u64) -> (QuatBatch, QuatBatch) {
    let mut rng = StdRng::seed_from_u64(seed);
    let a = QuatBatch::random(n, layout, &mut rng).unwrap();
    let b = QuatBatch::random(n, layout, &mut rng).unwrap();
    (a, b)
}

fn run(
    strategy: Strategy,
    workers: usize,
    a: &QuatBatch,
    b: &QuatBatch,
) -> (QuatBatch, Quaternion) {
    let kernel = kernel_for(strategy, workers).unwrap();
    let mut c = QuatBatch::zeroed(a.len(), a.layout()).unwrap();
    let d = kernel.run(a, b, &mut c).unwrap();
    (c, d)
}

fn operands_for(strategy: Strategy, n: usize, seed: u64) -> (QuatBatch, QuatBatch) {
    operands(n, layout_for(strategy, Layout::Interleaved), seed)
}

#[test]
fn test_product_matches_left_matrix() {
    let (a, b) = operands(1000, Layout::Interleaved, 1);
    let (c, _) = run(Strategy::Scalar, 1, &a, &b);
    for i in 0..1000 {
        let m = a.get(i).unwrap().left_mul_matrix();
        let v = b.get(i).unwrap().to_array();
        let got = c.get(i).unwrap().to_array();
        for k in 0..4 {
            let want: f32 = (0..4).map(|j| m[k][j] * v[j]).sum();
            assert_relative_eq!(got[k], want, epsilon = 1e-5, max_relative = 1e-5);
        }
    }
}

#[test]
fn test_all_strategies_agree_on_product() {
    let (a, b) = operands(1000, Layout::Interleaved, 2);
    let (reference, _) = run(Strategy::Scalar, 1, &a, &b);
    let reference = reference.to_vec();
    for strategy in Strategy::ALL {
        let layout = layout_for(strategy, Layout::Interleaved);
        let (a, b) = (a.to_layout(layout).unwrap(), b.to_layout(layout).unwrap());
        let (c, _) = run(strategy, 4, &a, &b);
        assert_eq!(c.to_vec(), reference, "{strategy}");
    }
}

#[test]
fn test_all_strategies_agree_on_reduction() {
    for n in [10, 1000, 10_000] {
        let (a, b) = operands(n, Layout::Planar, n as u64);
        let (c, _) = run(Strategy::Scalar, 1, &a, &b);
        let agreement = Agreement::of(&c);
        for strategy in Strategy::ALL {
            for workers in [1, 2, 3, 8] {
                let layout = layout_for(strategy, Layout::Planar);
                let (a, b) = (a.to_layout(layout).unwrap(), b.to_layout(layout).unwrap());
                let (_, d) = run(strategy, workers, &a, &b);
                let dev = agreement.deviation(&d);
                assert!(dev.within(), "{strategy} T={workers} n={n}: {d} {dev:?}");
            }
        }
    }
}

#[test]
fn test_layout_does_not_change_result() {
    let (a, b) = operands(777, Layout::Interleaved, 3);
    let (ap, bp) = (
        a.to_layout(Layout::Planar).unwrap(),
        b.to_layout(Layout::Planar).unwrap(),
    );
    for strategy in [Strategy::Scalar, Strategy::Parallel] {
        let (ci, di) = run(strategy, 3, &a, &b);
        let (cp, dp) = run(strategy, 3, &ap, &bp);
        assert_eq!(ci.to_vec(), cp.to_vec());
        assert_eq!(di, dp, "{strategy}");
    }
}

#[test]
fn test_self_product_identity() {
    let (a, _) = operands(500, Layout::Interleaved, 4);
    for q in a.iter() {
        let general = scalar::hamilton(&q, &q);
        let special = scalar::square(&q);
        assert_relative_eq!(general.w, special.w, epsilon = 1e-5);
        assert_eq!(general.x, q.w * q.x + q.x * q.w + q.y * q.z - q.z * q.y);
        assert_relative_eq!(general.x, special.x, epsilon = 1e-5);
        assert_relative_eq!(general.y, special.y, epsilon = 1e-5);
        assert_relative_eq!(general.z, special.z, epsilon = 1e-5);
    }
}

#[test]
fn test_not_commutative() {
    let (a, b) = operands(100, Layout::Interleaved, 5);
    let (ab, _) = run(Strategy::Scalar, 1, &a, &b);
    let (ba, _) = run(Strategy::Scalar, 1, &b, &a);
    assert_ne!(ab.to_vec(), ba.to_vec());
}

#[test]
fn test_identity_times_constant() {
    let b = Quaternion::new(2.0, 3.0, 4.0, 5.0);
    for strategy in Strategy::ALL {
        let layout = layout_for(strategy, Layout::Planar);
        let a = QuatBatch::from_quaternions(&[Quaternion::IDENTITY; 10], layout).unwrap();
        let bb = QuatBatch::from_quaternions(&[b; 10], layout).unwrap();
        for workers in [1, 4, 16] {
            let (c, d) = run(strategy, workers, &a, &bb);
            assert!(c.iter().all(|q| q == b), "{strategy}");
            assert_eq!(d, Quaternion::new(-460.0, 120.0, 160.0, 200.0), "{strategy}");
        }
    }
}

#[test]
fn test_zero_batch_reduces_to_zero() {
    for strategy in Strategy::ALL {
        let (a, _) = operands_for(strategy, 64, 6);
        let zero = QuatBatch::zeroed(64, a.layout()).unwrap();
        for workers in [1, 5] {
            let (c, d) = run(strategy, workers, &a, &zero);
            assert!(c.iter().all(|q| q == Quaternion::ZERO));
            assert_eq!(d, Quaternion::ZERO, "{strategy} T={workers}");
        }
    }
}

#[test]
fn test_repeated_runs_are_deterministic() {
    for strategy in Strategy::ALL {
        let (a, b) = operands_for(strategy, 4099, 7);
        let (_, first) = run(strategy, 6, &a, &b);
        for _ in 0..3 {
            let (_, again) = run(strategy, 6, &a, &b);
            assert_eq!(again, first, "{strategy}");
        }
    }
}

#[test]
fn test_parallel_single_worker_equals_scalar() {
    let (a, b) = operands(2500, Layout::Planar, 8);
    let mut c = QuatBatch::zeroed(2500, Layout::Planar).unwrap();
    let scalar = ScalarKernel.run(&a, &b, &mut c).unwrap();
    let parallel = ParallelKernel::new(1).unwrap().run(&a, &b, &mut c).unwrap();
    assert_eq!(scalar, parallel);
}
