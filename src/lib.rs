//! # Cotejar
//!
//! Host-side dispatch and validation harness for data-parallel device
//! compute kernels.
//!
//! Cotejar (Spanish: "to collate, to check against") drives one compute
//! kernel launch end to end and verifies the device's output against an
//! independent host recompute: allocate, partition, submit, wait,
//! validate, report. The device runtime is an opaque collaborator behind
//! the [`DeviceQueue`] trait; a data-parallel CPU reference queue and a
//! fault-injecting mock ship in-crate.
//!
//! ## Example
//!
//! ```rust
//! use cotejar::{CpuQueue, HarnessConfig, KernelHarness, VectorAdd};
//!
//! let harness = KernelHarness::new(CpuQueue::new());
//!
//! // 160 elements, 16 per execution unit, A[i] = B[i] = i
//! let config = HarnessConfig::linear(160, 16);
//! let outcome = harness.run(&config, &VectorAdd, |i| i as i32, |i| i as i32);
//!
//! assert!(outcome.passed());
//! assert_eq!(outcome.units, 10);
//! assert_eq!(outcome.mismatches, 0);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +------------------------+
//! |     KernelHarness      |  <- allocate / dispatch / wait / validate
//! +------------------------+
//! |  DeviceQueue (trait)   |  <- opaque device runtime seam
//! +------------------------+
//! |  CpuQueue | MockQueue  |  <- rayon reference | fault injection
//! +------------------------+
//! ```
//!
//! ## Failure semantics
//!
//! A dispatch-time fault is caught, logged, and folded into a failed
//! [`TestOutcome`]; there is no retry, and buffers are released by
//! ownership on every path. A validation mismatch is data in the outcome
//! (count plus first mismatching index); callers assert on it.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
// Clippy allows (MUST come after deny/warn to override them)
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)] // unit counts fit comfortably
#![allow(clippy::cast_precision_loss)] // index-derived seed values are small
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)] // lock() on unpoisoned mutexes
#![allow(clippy::uninlined_format_args)] // Prefer explicit format args

pub mod buffer;
pub mod element;
pub mod error;
pub mod harness;
pub mod kernel;
pub mod partition;
pub mod queue;
/// Deterministic input generators for tests and benches
pub mod testing;
pub mod validate;

pub use buffer::{AllocKind, AllocTracker, DeviceBuffer};
pub use element::{Dtype, Element, Tolerance};
pub use error::{CotejarError, Result};
pub use harness::{DispatchStats, HarnessConfig, KernelHarness, TestOutcome};
pub use kernel::{Kernel, TiledVectorAdd, VectorAdd};
pub use partition::{IndexSpace, LaunchConfig};
pub use queue::{CpuQueue, DeviceQueue, LaunchEvent, MockQueue, QueueCall};
pub use validate::{validate_vadd, Mismatch, ValidationReport};
