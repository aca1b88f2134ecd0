//! Index space partitioning
//!
//! A launch decomposes a flat buffer into equal contiguous blocks, one per
//! execution unit. Two decompositions exist: linear (each unit takes one
//! `vl`-wide vector) and tiled (each unit takes one `bl`×`bl` block). The
//! unit size must evenly divide the buffer length; [`LaunchConfig::units`]
//! enforces that invariant.

use serde::{Deserialize, Serialize};

use crate::error::{CotejarError, Result};

/// How the flat index space is decomposed across execution units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexSpace {
    /// 1-D: each unit processes one `vl`-wide vector
    Linear {
        /// Vector length per unit
        vl: usize,
    },
    /// 2-D: each unit processes one `bl`×`bl` tile, row-major
    Tiled {
        /// Tile edge length
        bl: usize,
    },
}

impl IndexSpace {
    /// Elements assigned to one execution unit
    #[must_use]
    pub fn unit_len(self) -> usize {
        match self {
            IndexSpace::Linear { vl } => vl,
            IndexSpace::Tiled { bl } => bl * bl,
        }
    }
}

/// One kernel launch over a partitioned index space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    len: usize,
    space: IndexSpace,
    group_size: usize,
}

impl LaunchConfig {
    /// Launch over `len` elements with the given index space
    #[must_use]
    pub fn new(len: usize, space: IndexSpace) -> Self {
        Self {
            len,
            space,
            group_size: 1,
        }
    }

    /// Set the work-group size
    #[must_use]
    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size;
        self
    }

    /// Total elements in the launch
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the launch covers no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index space decomposition
    #[must_use]
    pub fn space(&self) -> IndexSpace {
        self.space
    }

    /// Work-group size
    #[must_use]
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Elements assigned to one execution unit
    #[must_use]
    pub fn unit_len(&self) -> usize {
        self.space.unit_len()
    }

    /// Number of execution units
    ///
    /// # Errors
    ///
    /// Returns `InvalidPartition` if the unit size is zero or does not
    /// evenly divide the buffer length.
    pub fn units(&self) -> Result<usize> {
        let unit_len = self.unit_len();
        if unit_len == 0 {
            return Err(CotejarError::InvalidPartition {
                reason: format!("unit length is zero for {:?}", self.space),
            });
        }
        if !self.len.is_multiple_of(unit_len) {
            return Err(CotejarError::InvalidPartition {
                reason: format!(
                    "buffer length {} is not a multiple of unit length {} ({:?})",
                    self.len, unit_len, self.space
                ),
            });
        }
        Ok(self.len / unit_len)
    }
}
