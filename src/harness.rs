//! Kernel dispatch and validation harness
//!
//! [`KernelHarness`] drives one test case end to end: print the device
//! line, partition the index space, allocate the two input buffers and the
//! output buffer, submit, wait, validate, and fold everything into a
//! [`TestOutcome`]. A dispatch fault is caught, logged to stdout, and
//! becomes a failed outcome without retry. Buffers are released by
//! ownership on every path.
//!
//! The flow is strictly ordered: Idle → Allocated → Dispatched →
//! (Completed | Faulted) → Validated → Released. There is exactly one
//! suspension point, the wait on the launch event.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::buffer::AllocKind;
use crate::element::{Element, Tolerance};
use crate::error::CotejarError;
use crate::kernel::Kernel;
use crate::partition::{IndexSpace, LaunchConfig};
use crate::queue::DeviceQueue;
use crate::validate::{validate_vadd, Mismatch};

/// Configuration for one harness run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    len: usize,
    space: IndexSpace,
    group_size: usize,
    alloc_kind: AllocKind,
    tolerance: Option<Tolerance>,
    quiet: bool,
}

impl HarnessConfig {
    /// Linear launch: `len` elements, `vl` per unit
    #[must_use]
    pub fn linear(len: usize, vl: usize) -> Self {
        Self::with_space(len, IndexSpace::Linear { vl })
    }

    /// Tiled launch: `len` elements, one `bl`×`bl` tile per unit
    #[must_use]
    pub fn tiled(len: usize, bl: usize) -> Self {
        Self::with_space(len, IndexSpace::Tiled { bl })
    }

    /// Launch with an explicit index space
    #[must_use]
    pub fn with_space(len: usize, space: IndexSpace) -> Self {
        Self {
            len,
            space,
            group_size: 1,
            alloc_kind: AllocKind::Shared,
            tolerance: None,
            quiet: false,
        }
    }

    /// Set the work-group size
    #[must_use]
    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size;
        self
    }

    /// Set the allocation kind for all three buffers
    #[must_use]
    pub fn with_alloc_kind(mut self, kind: AllocKind) -> Self {
        self.alloc_kind = kind;
        self
    }

    /// Override the dtype-default comparison tolerance
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Suppress the informational stdout lines (benchmarks)
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Total elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the run covers no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The launch this config describes
    #[must_use]
    pub fn launch(&self) -> LaunchConfig {
        LaunchConfig::new(self.len, self.space).with_group_size(self.group_size)
    }
}

/// Counters across all runs of one harness
#[derive(Debug, Default)]
pub struct DispatchStats {
    launches: AtomicU64,
    completed: AtomicU64,
    faulted: AtomicU64,
    units_executed: AtomicU64,
}

impl DispatchStats {
    /// Launches attempted (including ones that faulted)
    #[must_use]
    pub fn launches(&self) -> u64 {
        self.launches.load(Ordering::Relaxed)
    }

    /// Launches that completed and were validated
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Launches that faulted at submit or wait
    #[must_use]
    pub fn faulted(&self) -> u64 {
        self.faulted.load(Ordering::Relaxed)
    }

    /// Execution units across completed launches
    #[must_use]
    pub fn units_executed(&self) -> u64 {
        self.units_executed.load(Ordering::Relaxed)
    }

    fn record_launch(&self) {
        self.launches.fetch_add(1, Ordering::Relaxed);
    }

    fn record_completed(&self, units: u64) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.units_executed.fetch_add(units, Ordering::Relaxed);
    }

    fn record_fault(&self) {
        self.faulted.fetch_add(1, Ordering::Relaxed);
    }
}

/// Result of one harness run
///
/// Produced once per run and never persisted. `passed()` is the assertion
/// surface: a run passes iff it neither faulted nor mismatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Device the launch ran on
    pub device: String,
    /// Kernel name
    pub kernel: String,
    /// Execution units in the launch (0 if partitioning failed)
    pub units: usize,
    /// Elements compared during validation
    pub checked: usize,
    /// Elements outside tolerance
    pub mismatches: usize,
    /// First element outside tolerance, if any
    pub first_mismatch: Option<Mismatch>,
    /// Fault text if the run never reached validation
    pub fault: Option<String>,
}

impl TestOutcome {
    /// Whether the run completed and validated clean
    #[must_use]
    pub fn passed(&self) -> bool {
        self.fault.is_none() && self.mismatches == 0
    }

    fn faulted(device: String, kernel: &str, units: usize, err: &CotejarError) -> Self {
        Self {
            device,
            kernel: kernel.to_string(),
            units,
            checked: 0,
            mismatches: 0,
            first_mismatch: None,
            fault: Some(err.to_string()),
        }
    }
}

/// Dispatch-and-validate harness over one device queue
#[derive(Debug)]
pub struct KernelHarness<Q> {
    queue: Q,
    stats: DispatchStats,
}

impl<Q: DeviceQueue> KernelHarness<Q> {
    /// Harness over the default device of queue kind `Q`
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if acquisition fails.
    pub fn acquire() -> crate::error::Result<Self> {
        Ok(Self::new(Q::acquire()?))
    }

    /// Harness over an explicit queue
    #[must_use]
    pub fn new(queue: Q) -> Self {
        Self {
            queue,
            stats: DispatchStats::default(),
        }
    }

    /// The underlying queue
    #[must_use]
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Counters across this harness's runs
    #[must_use]
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Run one dispatch-and-validate case
    ///
    /// Allocates `a` and `b` from the init functions and a zeroed output,
    /// submits `kernel` over the configured partition, waits, validates
    /// against the host recompute, and reports. Faults at any stage fold
    /// into the outcome; buffers allocated so far are released on every
    /// path.
    pub fn run<T, K>(
        &self,
        config: &HarnessConfig,
        kernel: &K,
        init_a: impl Fn(usize) -> T,
        init_b: impl Fn(usize) -> T,
    ) -> TestOutcome
    where
        T: Element,
        K: Kernel<T>,
    {
        let device = self.queue.device_name();
        if !config.quiet {
            println!("Running on {device}");
        }

        let launch = config.launch();
        self.stats.record_launch();

        let units = match launch.units() {
            Ok(units) => units,
            Err(err) => {
                self.stats.record_fault();
                if !config.quiet {
                    println!("dispatch fault caught: {err}");
                }
                return TestOutcome::faulted(device, kernel.name(), 0, &err);
            }
        };

        // Allocated
        let allocated = self
            .queue
            .alloc_init(config.len, config.alloc_kind, &init_a)
            .and_then(|a| {
                let b = self.queue.alloc_init(config.len, config.alloc_kind, &init_b)?;
                let c = self.queue.alloc_zeroed::<T>(config.len, config.alloc_kind)?;
                Ok((a, b, c))
            });
        let (a, b, mut c) = match allocated {
            Ok(buffers) => buffers,
            Err(err) => {
                self.stats.record_fault();
                if !config.quiet {
                    println!("dispatch fault caught: {err}");
                }
                return TestOutcome::faulted(device, kernel.name(), units, &err);
            }
        };

        // Dispatched; the wait below is the only suspension point
        let completed = self
            .queue
            .submit(&launch, kernel, &a, &b, &mut c)
            .and_then(crate::queue::LaunchEvent::wait);
        if let Err(err) = completed {
            self.stats.record_fault();
            if !config.quiet {
                println!("dispatch fault caught: {err}");
            }
            return TestOutcome::faulted(device, kernel.name(), units, &err);
        }
        self.stats.record_completed(units as u64);

        // Validated
        let tolerance = config
            .tolerance
            .unwrap_or_else(|| Tolerance::for_dtype(T::DTYPE));
        match validate_vadd(a.as_slice(), b.as_slice(), c.as_slice(), tolerance) {
            Ok(report) => TestOutcome {
                device,
                kernel: kernel.name().to_string(),
                units,
                checked: report.checked,
                mismatches: report.mismatches,
                first_mismatch: report.first_mismatch,
                fault: None,
            },
            Err(err) => TestOutcome::faulted(device, kernel.name(), units, &err),
        }
        // Released: a, b, c drop here (and on every early return above)
    }
}
