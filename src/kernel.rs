//! Compute kernels
//!
//! A [`Kernel`] is invoked once per execution unit; each invocation sees
//! only its unit's slice of the two input buffers and the matching slice of
//! the output buffer. The two provided kernels are the element-wise vector
//! add in its linear and tiled forms.

use crate::element::Element;
use crate::error::{CotejarError, Result};

/// A compute kernel executed once per unit over its assigned slices
///
/// `a`, `b`, and `c` are exactly the unit's block: `unit_len` elements
/// each. Units run data-parallel, so implementations must not assume
/// anything about other units' blocks.
pub trait Kernel<T: Element>: Sync {
    /// Kernel name, used in diagnostics and mock call records
    fn name(&self) -> &'static str;

    /// Execute one unit
    ///
    /// # Errors
    ///
    /// Returns `InvalidShape` if the slices disagree in length.
    fn execute_unit(&self, unit: usize, a: &[T], b: &[T], c: &mut [T]) -> Result<()>;
}

fn check_unit_shapes<T>(a: &[T], b: &[T], c: &[T]) -> Result<()> {
    if a.len() != c.len() || b.len() != c.len() {
        return Err(CotejarError::InvalidShape {
            reason: format!(
                "unit slices disagree: a={}, b={}, c={}",
                a.len(),
                b.len(),
                c.len()
            ),
        });
    }
    Ok(())
}

/// Element-wise vector add, one linear vector per unit
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorAdd;

impl<T: Element> Kernel<T> for VectorAdd {
    fn name(&self) -> &'static str {
        "vadd.linear"
    }

    fn execute_unit(&self, _unit: usize, a: &[T], b: &[T], c: &mut [T]) -> Result<()> {
        check_unit_shapes(a, b, c)?;
        for ((out, &x), &y) in c.iter_mut().zip(a).zip(b) {
            *out = x.add(y);
        }
        Ok(())
    }
}

/// Element-wise vector add over one tile, processed in `vl`-wide segments
///
/// Walks the unit's tile row-major, `vl` elements at a time: the access
/// pattern a SIMD device kernel uses over a `bl`×`bl` block.
#[derive(Debug, Clone, Copy)]
pub struct TiledVectorAdd {
    vl: usize,
}

impl TiledVectorAdd {
    /// Tile kernel with the given vector width
    #[must_use]
    pub fn new(vl: usize) -> Self {
        Self { vl }
    }

    /// Vector width per segment
    #[must_use]
    pub fn vl(&self) -> usize {
        self.vl
    }
}

impl<T: Element> Kernel<T> for TiledVectorAdd {
    fn name(&self) -> &'static str {
        "vadd.tiled"
    }

    fn execute_unit(&self, _unit: usize, a: &[T], b: &[T], c: &mut [T]) -> Result<()> {
        check_unit_shapes(a, b, c)?;
        if self.vl == 0 || !c.len().is_multiple_of(self.vl) {
            return Err(CotejarError::InvalidShape {
                reason: format!(
                    "tile of {} elements is not segmentable by vector width {}",
                    c.len(),
                    self.vl
                ),
            });
        }
        for seg in (0..c.len()).step_by(self.vl) {
            for i in seg..seg + self.vl {
                c[i] = a[i].add(b[i]);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::bf16;

    #[test]
    fn test_vector_add_unit() {
        let a = [1i32, 2, 3, 4];
        let b = [10i32, 20, 30, 40];
        let mut c = [0i32; 4];
        VectorAdd.execute_unit(0, &a, &b, &mut c).unwrap();
        assert_eq!(c, [11, 22, 33, 44]);
    }

    #[test]
    fn test_vector_add_shape_mismatch() {
        let a = [1i32, 2];
        let b = [3i32, 4, 5];
        let mut c = [0i32; 3];
        let err = VectorAdd.execute_unit(0, &a, &b, &mut c).unwrap_err();
        assert!(matches!(err, CotejarError::InvalidShape { .. }));
    }

    #[test]
    fn test_tiled_add_walks_whole_tile() {
        // 4x4 tile, vl=4: four row segments
        let a: Vec<i32> = (0..16).collect();
        let b: Vec<i32> = (0..16).map(|i| i * 10).collect();
        let mut c = vec![0i32; 16];
        TiledVectorAdd::new(4).execute_unit(0, &a, &b, &mut c).unwrap();
        for i in 0..16 {
            assert_eq!(c[i], a[i] + b[i]);
        }
    }

    #[test]
    fn test_tiled_add_rejects_unsegmentable_tile() {
        let a = [0i32; 10];
        let b = [0i32; 10];
        let mut c = [0i32; 10];
        let err = TiledVectorAdd::new(4)
            .execute_unit(0, &a, &b, &mut c)
            .unwrap_err();
        assert!(matches!(err, CotejarError::InvalidShape { .. }));
    }

    #[test]
    fn test_tiled_add_rejects_zero_vl() {
        let a = [0i32; 4];
        let b = [0i32; 4];
        let mut c = [0i32; 4];
        assert!(TiledVectorAdd::new(0).execute_unit(0, &a, &b, &mut c).is_err());
    }

    #[test]
    fn test_bf16_add_rounds_to_grid() {
        let a = [bf16::from_f32(300.0)];
        let b = [bf16::from_f32(3.0)];
        let mut c = [bf16::ZERO];
        VectorAdd.execute_unit(0, &a, &b, &mut c).unwrap();
        // 303 is not on the bf16 grid (spacing 2 above 256); 304 is
        assert_eq!(c[0].to_f32(), 304.0);
    }

    #[test]
    fn test_kernel_names() {
        assert_eq!(Kernel::<i32>::name(&VectorAdd), "vadd.linear");
        assert_eq!(Kernel::<i32>::name(&TiledVectorAdd::new(16)), "vadd.tiled");
    }
}
