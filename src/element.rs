//! Element types and comparison tolerances
//!
//! The harness is generic over the numeric element a kernel operates on.
//! [`Element`] covers the three types the vadd kernels are dispatched with:
//! `i32`, `f32`, and `bf16` (brain-float, 8-bit mantissa). Each type carries
//! its own comparison semantics: integers compare exactly, bf16 compares
//! within a tolerance that absorbs device-side rounding differences.

use half::bf16;
use serde::{Deserialize, Serialize};

/// Runtime tag for an element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dtype {
    /// 32-bit signed integer
    I32,
    /// 32-bit IEEE float
    F32,
    /// 16-bit brain float (8 exponent bits, 7 mantissa bits)
    Bf16,
}

impl Dtype {
    /// Size of one element in bytes
    #[must_use]
    pub fn size_of(self) -> usize {
        match self {
            Dtype::I32 | Dtype::F32 => 4,
            Dtype::Bf16 => 2,
        }
    }

    /// Short name used in diagnostics
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Dtype::I32 => "i32",
            Dtype::F32 => "f32",
            Dtype::Bf16 => "bf16",
        }
    }
}

/// Tolerance mode for comparing device output against the host recompute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Tolerance {
    /// Bit-exact equality
    Exact,
    /// Maximum allowed absolute difference per element
    Absolute(f64),
    /// Maximum allowed difference relative to `max(|expected|, 1.0)`
    Relative(f64),
}

/// Relative tolerance for bf16: two ULPs at the result's magnitude.
const BF16_RELATIVE_TOL: f64 = 0.0078125; // 2^-7

impl Tolerance {
    /// Default tolerance for a dtype
    ///
    /// Integer and f32 sums of index-derived values are exact; bf16 gets a
    /// relative tolerance of 2⁻⁷ (two bf16 ULPs) to absorb device rounding.
    #[must_use]
    pub fn for_dtype(dtype: Dtype) -> Self {
        match dtype {
            Dtype::I32 | Dtype::F32 => Tolerance::Exact,
            Dtype::Bf16 => Tolerance::Relative(BF16_RELATIVE_TOL),
        }
    }

    /// Whether `actual` is an acceptable rendition of `expected`
    #[must_use]
    pub fn accepts(self, expected: f64, actual: f64) -> bool {
        match self {
            Tolerance::Exact => expected == actual,
            Tolerance::Absolute(tol) => (expected - actual).abs() <= tol,
            Tolerance::Relative(tol) => {
                (expected - actual).abs() <= tol * expected.abs().max(1.0)
            }
        }
    }
}

/// A fixed-width numeric element a kernel can operate on
///
/// Implementations define how seed values derive from element indices, how
/// the device computes an element-wise sum, and how values widen to `f64`
/// for host-side comparison.
pub trait Element: Copy + Send + Sync + PartialEq + std::fmt::Debug + 'static {
    /// Runtime dtype tag
    const DTYPE: Dtype;

    /// Additive identity; output buffers start from this
    const ZERO: Self;

    /// Value derived from a flat element index (deterministic seed data)
    fn from_index(index: usize) -> Self;

    /// Element-wise sum as the device computes it
    fn add(self, rhs: Self) -> Self;

    /// Widen to f64 for comparison and reporting
    fn to_f64(self) -> f64;
}

impl Element for i32 {
    const DTYPE: Dtype = Dtype::I32;
    const ZERO: Self = 0;

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn from_index(index: usize) -> Self {
        index as i32
    }

    fn add(self, rhs: Self) -> Self {
        // Device integer add wraps on overflow
        self.wrapping_add(rhs)
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Element for f32 {
    const DTYPE: Dtype = Dtype::F32;
    const ZERO: Self = 0.0;

    #[allow(clippy::cast_precision_loss)]
    fn from_index(index: usize) -> Self {
        index as f32
    }

    fn add(self, rhs: Self) -> Self {
        self + rhs
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Element for bf16 {
    const DTYPE: Dtype = Dtype::Bf16;
    const ZERO: Self = bf16::ZERO;

    #[allow(clippy::cast_precision_loss)]
    fn from_index(index: usize) -> Self {
        bf16::from_f32(index as f32)
    }

    fn add(self, rhs: Self) -> Self {
        // Accumulate in f32 and round back, the sequence device ALUs
        // use for reduced-precision types
        bf16::from_f32(self.to_f32() + rhs.to_f32())
    }

    fn to_f64(self) -> f64 {
        f64::from(self.to_f32())
    }
}
