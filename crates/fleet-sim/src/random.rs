//! ---
//! fleet_section: "11-simulation"
//! fleet_subsection: "module"
//! fleet_type: "source"
//! fleet_scope: "code"
//! fleet_description: "Uniform randomness sources consumed by the vehicle model."
//! fleet_version: "v0.1.0"
//! fleet_owner: "tbd"
//! ---
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniformly distributed values over caller-supplied ranges.
///
/// Both methods sample the half-open interval `[low, high)` and return `low`
/// when the interval is empty.
pub trait UniformSource {
    /// Uniform float in `[low, high)`.
    fn uniform_f64(&mut self, low: f64, high: f64) -> f64;
    /// Uniform integer in `[low, high)`.
    fn uniform_u32(&mut self, low: u32, high: u32) -> u32;
}

/// Adapter exposing any [`rand::Rng`] as a [`UniformSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    /// Deterministic source, reproducible across runs for the same seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Source seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> UniformSource for RngSource<R> {
    fn uniform_f64(&mut self, low: f64, high: f64) -> f64 {
        if low < high {
            self.rng.gen_range(low..high)
        } else {
            low
        }
    }

    fn uniform_u32(&mut self, low: u32, high: u32) -> u32 {
        if low < high {
            self.rng.gen_range(low..high)
        } else {
            low
        }
    }
}

/// Source that always yields the lower bound of every requested range.
///
/// Every event whose probability is above zero fires under this source, which
/// makes the model fully deterministic for regression tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowerBoundSource;

impl UniformSource for LowerBoundSource {
    fn uniform_f64(&mut self, low: f64, _high: f64) -> f64 {
        low
    }

    fn uniform_u32(&mut self, low: u32, _high: u32) -> u32 {
        low
    }
}
