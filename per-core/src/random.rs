//! Source of uniform random numbers for sampling.
use rand::{
    rngs::{SmallRng, StdRng},
    Rng,
};

/// Draws uniform random numbers.
///
/// The sampler only needs `uniform(low, high)`. Seeded generators make
/// sampling reproducible.
pub trait RandomSource {
    /// Returns a value in `[low, high)`, or `low` if `high <= low`.
    fn uniform(&mut self, low: f32, high: f32) -> f32;
}

#[inline]
fn scale(low: f32, high: f32, unit: f32) -> f32 {
    if high <= low {
        return low;
    }
    let v = low + (high - low) * unit;
    // Rounding may push `v` onto `high`.
    if v < high {
        v
    } else {
        low
    }
}

impl RandomSource for StdRng {
    fn uniform(&mut self, low: f32, high: f32) -> f32 {
        scale(low, high, self.gen::<f32>())
    }
}

impl RandomSource for SmallRng {
    fn uniform(&mut self, low: f32, high: f32) -> f32 {
        scale(low, high, self.gen::<f32>())
    }
}

impl RandomSource for fastrand::Rng {
    fn uniform(&mut self, low: f32, high: f32) -> f32 {
        scale(low, high, self.f32())
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn uniform(&mut self, low: f32, high: f32) -> f32 {
        (**self).uniform(low, high)
    }
}
