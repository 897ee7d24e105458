//! Cycle measurement around a kernel invocation.
//!
//! A measurement is a value: [`start`] returns a [`CycleStamp`] that is moved
//! into [`stop`], so concurrent or nested measurements never share state.
//! On x86_64 the stamp reads the time-stamp counter; elsewhere it falls back to
//! a monotonic clock and counts nanoseconds.

use std::fmt;
use std::time::{Duration, Instant};

/// Elapsed counter ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Cycles(pub u64);

impl Cycles {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Cycles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Start point of one measurement.
#[derive(Debug, Clone, Copy)]
#[must_use = "pass the stamp to `stop` to obtain the elapsed cycles"]
pub enum CycleStamp {
    #[cfg(target_arch = "x86_64")]
    Tsc(u64),
    #[cfg(not(target_arch = "x86_64"))]
    Clock(Instant),
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn read_tsc() -> u64 {
    // SAFETY: `rdtsc` is available on every x86_64 CPU.
    unsafe { std::arch::x86_64::_rdtsc() }
}

/// Begin a measurement.
#[inline(always)]
pub fn start() -> CycleStamp {
    #[cfg(target_arch = "x86_64")]
    {
        CycleStamp::Tsc(read_tsc())
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        CycleStamp::Clock(Instant::now())
    }
}

/// End a measurement started with [`start`].
#[inline(always)]
pub fn stop(stamp: CycleStamp) -> Cycles {
    match stamp {
        #[cfg(target_arch = "x86_64")]
        CycleStamp::Tsc(t0) => Cycles(read_tsc().wrapping_sub(t0)),
        #[cfg(not(target_arch = "x86_64"))]
        CycleStamp::Clock(t0) => {
            Cycles(u64::try_from(t0.elapsed().as_nanos()).unwrap_or(u64::MAX))
        }
    }
}

/// Run `f` once and return its value with the elapsed cycles.
#[inline]
pub fn measure<R>(f: impl FnOnce() -> R) -> (R, Cycles) {
    let stamp = start();
    let out = f();
    let cycles = stop(stamp);
    (out, cycles)
}

/// Estimate the counter rate in MHz by counting ticks across `sleep`.
pub fn estimate_clock_mhz(sleep: Duration) -> f64 {
    let wall = Instant::now();
    let stamp = start();
    std::thread::sleep(sleep);
    let ticks = stop(stamp);
    let micros = wall.elapsed().as_secs_f64() * 1e6;
    if micros > 0.0 {
        ticks.get() as f64 / micros
    } else {
        0.0
    }
}
