//! Deterministic random numbers for parameter initialisation and tests.
//!
//! A xorshift64 generator: fast, seedable, and identical across platforms, so
//! gradient checks and demos are reproducible without an external RNG crate.

use crate::tensor::{Indices, Mask, Tensor};

const FALLBACK_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (zero is replaced by a fixed constant).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { FALLBACK_SEED } else { seed };
        Self { state }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform sample in [0, 1) with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform sample in [low, high).
    pub fn gen_range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Integer sample in [0, upper).
    pub fn gen_usize(&mut self, upper: usize) -> usize {
        if upper == 0 {
            0
        } else {
            (self.next_u64() % upper as u64) as usize
        }
    }

    /// Standard normal sample (Box-Muller).
    pub fn gen_normal(&mut self) -> f64 {
        // 1 - u keeps the log argument in (0, 1].
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    pub fn uniform_tensor(&mut self, shape: &[usize], low: f64, high: f64) -> Tensor {
        Tensor::from_fn(shape, |_| self.gen_range_f64(low, high))
    }

    /// Normal samples scaled by `scale`.
    pub fn normal_tensor(&mut self, shape: &[usize], scale: f64) -> Tensor {
        Tensor::from_fn(shape, |_| scale * self.gen_normal())
    }

    /// Integer ids drawn uniformly from [0, upper).
    pub fn index_tensor(&mut self, shape: &[usize], upper: usize) -> Indices {
        Tensor::from_fn(shape, |_| self.gen_usize(upper))
    }

    /// Each entry is true with probability `p_true`.
    pub fn mask_tensor(&mut self, shape: &[usize], p_true: f64) -> Mask {
        Tensor::from_fn(shape, |_| self.next_f64() < p_true)
    }
}
