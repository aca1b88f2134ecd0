//! Host-side result validation
//!
//! After the queue reports completion, the harness recomputes the expected
//! sum for every element on the host, independently of the kernel, and
//! compares. The report carries the mismatch count (0 means the launch
//! validated clean) and the first mismatching element for diagnostics.

use serde::{Deserialize, Serialize};

use crate::element::{Element, Tolerance};
use crate::error::{CotejarError, Result};

/// One mismatching element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Flat element index
    pub index: usize,
    /// Host-computed expected value
    pub expected: f64,
    /// Value the device wrote
    pub actual: f64,
}

/// Outcome of validating one launch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Elements compared
    pub checked: usize,
    /// Elements outside tolerance
    pub mismatches: usize,
    /// First element outside tolerance, if any
    pub first_mismatch: Option<Mismatch>,
}

impl ValidationReport {
    /// Whether every element was within tolerance
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.mismatches == 0
    }
}

/// Validate an element-wise add: `c[i]` must equal `a[i] + b[i]`
///
/// The expected value is recomputed in the element type's own arithmetic
/// (bf16 sums round to the bf16 grid) and compared under `tolerance`.
///
/// # Errors
///
/// Returns `InvalidShape` if the three slices disagree in length.
pub fn validate_vadd<T: Element>(
    a: &[T],
    b: &[T],
    c: &[T],
    tolerance: Tolerance,
) -> Result<ValidationReport> {
    if a.len() != c.len() || b.len() != c.len() {
        return Err(CotejarError::InvalidShape {
            reason: format!(
                "validation slices disagree: a={}, b={}, c={}",
                a.len(),
                b.len(),
                c.len()
            ),
        });
    }

    let mut mismatches = 0;
    let mut first_mismatch = None;
    for (i, &out) in c.iter().enumerate() {
        let expected = a[i].add(b[i]).to_f64();
        let actual = out.to_f64();
        if !tolerance.accepts(expected, actual) {
            mismatches += 1;
            if first_mismatch.is_none() {
                first_mismatch = Some(Mismatch {
                    index: i,
                    expected,
                    actual,
                });
            }
        }
    }

    Ok(ValidationReport {
        checked: c.len(),
        mismatches,
        first_mismatch,
    })
}
