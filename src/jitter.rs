//! Jitter sources used to de-synchronize retrying clients.
//!
//! Many clients recovering from the same outage would otherwise retry in
//! lockstep; a little randomness spreads them out. The purpose is collision
//! avoidance, not security-grade randomness; any distribution is acceptable.
//!
//! Which source to use:
//! - [`UniformJitter`]: uniform in `[0, max]`, the production default.
//! - [`NoJitter`]: deterministic schedules for tests or tightly controlled
//!   workflows.
//! - [`FixedJitter`]: a known, nonzero constant for tests.

use rand::{rng, Rng};

/// Source of non-negative jitter amounts, in milliseconds.
pub trait JitterSource: Send + Sync + std::fmt::Debug {
    fn next_millis(&self) -> u64;
}

/// Uniform jitter in `[0, max_millis]`, backed by `rand`'s thread-local RNG.
#[derive(Debug, Clone, Copy)]
pub struct UniformJitter {
    max_millis: u64,
}

impl UniformJitter {
    pub fn new(max_millis: u64) -> Self {
        Self { max_millis }
    }

    /// Sample with a caller-supplied RNG (for deterministic tests).
    pub fn sample_with_rng<R: Rng>(&self, rng: &mut R) -> u64 {
        if self.max_millis == 0 {
            return 0;
        }
        rng.random_range(0..=self.max_millis)
    }
}

impl Default for UniformJitter {
    /// Up to one second of smear.
    fn default() -> Self {
        Self { max_millis: 1_000 }
    }
}

impl JitterSource for UniformJitter {
    fn next_millis(&self) -> u64 {
        self.sample_with_rng(&mut rng())
    }
}

/// No jitter; every sample is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn next_millis(&self) -> u64 {
        0
    }
}

/// Constant jitter for tests that need a known, nonzero value.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub u64);

impl JitterSource for FixedJitter {
    fn next_millis(&self) -> u64 {
        self.0
    }
}
