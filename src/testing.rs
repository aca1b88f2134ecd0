//! Deterministic input generators
//!
//! Seed-data helpers for harness tests and benches. Everything here is
//! reproducible: the same seed always yields the same buffer contents.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::element::Element;

/// Identity initializer: each element equals its index
///
/// The seed pattern both original vadd cases use (`A[i] = B[i] = i`).
pub fn index_init<T: Element>() -> impl Fn(usize) -> T {
    T::from_index
}

/// Constant initializer
pub fn const_init<T: Element>(value: T) -> impl Fn(usize) -> T {
    move |_| value
}

/// Initializer backed by a precomputed table
///
/// # Panics
///
/// Panics if queried past the table length (test helper).
#[must_use]
pub fn table_init<T: Element>(values: Vec<T>) -> impl Fn(usize) -> T {
    move |i| values[i]
}

/// Deterministic random input generator
///
/// # Example
///
/// ```rust
/// use cotejar::testing::SeededInput;
///
/// let gen = SeededInput::new(42);
/// let a = gen.generate_i32(64, 1000);
/// let b = gen.generate_i32(64, 1000);
/// assert_eq!(a, b); // same seed, same data
/// ```
pub struct SeededInput {
    seed: u64,
}

impl SeededInput {
    /// Generator with a specific seed
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Generate i32 values in `[0, max)`
    #[must_use]
    pub fn generate_i32(&self, len: usize, max: i32) -> Vec<i32> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..len).map(|_| rng.gen_range(0..max)).collect()
    }

    /// Generate f32 values in `[-scale, scale)`
    #[must_use]
    pub fn generate_f32(&self, len: usize, scale: f32) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..len).map(|_| rng.gen_range(-scale..scale)).collect()
    }
}
