use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{curve::Point, MandalaError, Result};

/// Seedable pseudo-random source shared by every generation step.
///
/// Two sources created with the same seed produce the same sequence of
/// curves, colours and counts, which keeps renders reproducible.
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
    rng: StdRng,
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Picks a fresh seed from the operating system.
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random::<u64>())
    }

    /// Seed this source was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform integer in `[min, max]`, inclusive on both ends.
    pub fn int_between(&mut self, min: u32, max: u32) -> Result<u32> {
        if min > max {
            return Err(MandalaError::bounds("integer range", min as f64, max as f64));
        }
        Ok(self.rng.random_range(min..=max))
    }

    /// Uniform float in `[min, max)`. A collapsed range returns `min`.
    /// The span `max - min` must itself be finite.
    pub fn float_between(&mut self, min: f64, max: f64) -> Result<f64> {
        if min > max || !(max - min).is_finite() {
            return Err(MandalaError::bounds("float range", min, max));
        }
        if min == max {
            return Ok(min);
        }
        Ok(self.rng.random_range(min..max))
    }

    /// Point in the unit square `[0, 1) x [0, 1)`.
    pub fn unit_point(&mut self) -> Point {
        Point::new(self.rng.random_range(0.0..1.0), self.rng.random_range(0.0..1.0))
    }

    /// Uniform colour channel value.
    pub(crate) fn channel(&mut self) -> u8 {
        self.rng.random_range(0..=u8::MAX)
    }
}

/// Left-pads `value` with `'0'` up to `width` characters.
pub fn zero_pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len >= width {
        return value.to_string();
    }
    let mut padded = "0".repeat(width - len);
    padded.push_str(value);
    padded
}
