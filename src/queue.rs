//! Device queues
//!
//! [`DeviceQueue`] is the seam to the device runtime: acquire the default
//! device, allocate buffers, submit a kernel over a partitioned index
//! space, and wait on the returned [`LaunchEvent`]. The runtime itself is
//! an opaque collaborator; two implementations ship here:
//!
//! - [`CpuQueue`]: the reference queue. Executes units data-parallel on
//!   the host thread pool; semantics match what a device queue must do.
//! - [`MockQueue`]: records calls and injects faults, for exercising the
//!   harness failure paths without hardware.
//!
//! Submission is asynchronous from the caller's point of view: `submit`
//! returns an event, and faults that surface during execution are observed
//! at [`LaunchEvent::wait`], the single blocking suspension point.

use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::buffer::{AllocKind, AllocTracker, DeviceBuffer};
use crate::element::{Dtype, Element};
use crate::error::{CotejarError, Result};
use crate::kernel::Kernel;
use crate::partition::LaunchConfig;

/// Completion handle for one submitted launch
///
/// Consumed by `wait`: a launch is waited on exactly once, and the
/// dispatch-order contract (no validation before completion) falls out of
/// the ownership.
#[derive(Debug)]
#[must_use = "a launch is not complete until wait() returns"]
pub struct LaunchEvent {
    status: Result<()>,
}

impl LaunchEvent {
    /// Event for a launch whose units all completed
    #[must_use]
    pub fn completed() -> Self {
        Self { status: Ok(()) }
    }

    /// Event carrying a fault discovered during execution
    #[must_use]
    pub fn faulted(err: CotejarError) -> Self {
        Self { status: Err(err) }
    }

    /// Block until the launch completes
    ///
    /// # Errors
    ///
    /// Returns the dispatch fault if any unit faulted.
    pub fn wait(self) -> Result<()> {
        self.status
    }
}

/// The device/queue/context abstraction
///
/// Mirrors what the harness needs from a device runtime: default-device
/// acquisition, a device name for the informational stdout line, buffer
/// allocation against a tracked pool, and submit/wait.
pub trait DeviceQueue {
    /// Acquire the default device queue
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if no device of this kind exists.
    fn acquire() -> Result<Self>
    where
        Self: Sized;

    /// Whether this queue kind is usable on the host
    fn is_available() -> bool
    where
        Self: Sized;

    /// Device name for diagnostics
    fn device_name(&self) -> String;

    /// Allocation tracker shared by all buffers from this queue
    fn tracker(&self) -> &Arc<AllocTracker>;

    /// Allocate a buffer and initialize each element from its index
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot satisfy the allocation.
    fn alloc_init<T: Element>(
        &self,
        len: usize,
        kind: AllocKind,
        init: &dyn Fn(usize) -> T,
    ) -> Result<DeviceBuffer<T>>;

    /// Allocate a zero-initialized buffer (the output-buffer case)
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot satisfy the allocation.
    fn alloc_zeroed<T: Element>(&self, len: usize, kind: AllocKind) -> Result<DeviceBuffer<T>> {
        self.alloc_init(len, kind, &|_| T::ZERO)
    }

    /// Submit one kernel invocation per execution unit
    ///
    /// Each unit reads its slice of `a` and `b` and writes its slice of
    /// `c`. Execution may begin before `submit` returns; completion and
    /// execution-time faults are observed at [`LaunchEvent::wait`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidShape` if the buffers disagree with the launch,
    /// `InvalidPartition` if the unit size does not divide the length, or
    /// `DispatchFault` if submission itself fails.
    fn submit<T: Element>(
        &self,
        launch: &LaunchConfig,
        kernel: &dyn Kernel<T>,
        a: &DeviceBuffer<T>,
        b: &DeviceBuffer<T>,
        c: &mut DeviceBuffer<T>,
    ) -> Result<LaunchEvent>;
}

fn check_launch_shapes<T: Element>(
    launch: &LaunchConfig,
    a: &DeviceBuffer<T>,
    b: &DeviceBuffer<T>,
    c: &DeviceBuffer<T>,
) -> Result<()> {
    if a.len() != launch.len() || b.len() != launch.len() || c.len() != launch.len() {
        return Err(CotejarError::InvalidShape {
            reason: format!(
                "launch covers {} elements but buffers are a={}, b={}, c={}",
                launch.len(),
                a.len(),
                b.len(),
                c.len()
            ),
        });
    }
    Ok(())
}

/// Reference queue executing units data-parallel on the host
///
/// Each unit's output block is a disjoint chunk of `c`, so units run
/// without locking.
#[derive(Debug)]
pub struct CpuQueue {
    tracker: Arc<AllocTracker>,
}

impl CpuQueue {
    /// Create a queue with a fresh allocation tracker
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracker: Arc::new(AllocTracker::new()),
        }
    }
}

impl Default for CpuQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceQueue for CpuQueue {
    fn acquire() -> Result<Self> {
        Ok(Self::new())
    }

    fn is_available() -> bool {
        true
    }

    fn device_name(&self) -> String {
        format!(
            "CPU reference device ({} threads)",
            rayon::current_num_threads()
        )
    }

    fn tracker(&self) -> &Arc<AllocTracker> {
        &self.tracker
    }

    fn alloc_init<T: Element>(
        &self,
        len: usize,
        kind: AllocKind,
        init: &dyn Fn(usize) -> T,
    ) -> Result<DeviceBuffer<T>> {
        Ok(DeviceBuffer::with_init(
            len,
            kind,
            Arc::clone(&self.tracker),
            init,
        ))
    }

    fn submit<T: Element>(
        &self,
        launch: &LaunchConfig,
        kernel: &dyn Kernel<T>,
        a: &DeviceBuffer<T>,
        b: &DeviceBuffer<T>,
        c: &mut DeviceBuffer<T>,
    ) -> Result<LaunchEvent> {
        check_launch_shapes(launch, a, b, c)?;
        let units = launch.units()?;
        if units == 0 {
            return Ok(LaunchEvent::completed());
        }

        let unit_len = launch.unit_len();
        let a = a.as_slice();
        let b = b.as_slice();
        let status = c
            .as_mut_slice()
            .par_chunks_mut(unit_len)
            .enumerate()
            .try_for_each(|(unit, out)| {
                let span = unit * unit_len..(unit + 1) * unit_len;
                kernel.execute_unit(unit, &a[span.clone()], &b[span], out)
            });

        match status {
            Ok(()) => Ok(LaunchEvent::completed()),
            Err(err) => Ok(LaunchEvent::faulted(err)),
        }
    }
}

/// One call observed by [`MockQueue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueCall {
    /// Buffer allocation
    Alloc {
        /// Element type allocated
        dtype: Dtype,
        /// Element count
        len: usize,
        /// Allocation kind
        kind: AllocKind,
    },
    /// Kernel submission
    Submit {
        /// Kernel name
        kernel: String,
        /// Execution units in the launch
        units: usize,
        /// Work-group size
        group_size: usize,
    },
}

/// Recording queue with configurable fault injection
///
/// Delegates real compute to an inner [`CpuQueue`]; faults configured at
/// construction surface either at `submit` (submission rejected) or at
/// `wait` (execution-time fault).
#[derive(Debug)]
pub struct MockQueue {
    inner: CpuQueue,
    name: String,
    calls: Mutex<Vec<QueueCall>>,
    submit_fault: Option<String>,
    wait_fault: Option<String>,
}

impl MockQueue {
    /// Create a mock with the given device name
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            inner: CpuQueue::new(),
            name: name.to_string(),
            calls: Mutex::new(Vec::new()),
            submit_fault: None,
            wait_fault: None,
        }
    }

    /// Fault every submission with the given reason
    #[must_use]
    pub fn with_submit_fault(mut self, reason: &str) -> Self {
        self.submit_fault = Some(reason.to_string());
        self
    }

    /// Let submission succeed but fault at wait with the given reason
    #[must_use]
    pub fn with_wait_fault(mut self, reason: &str) -> Self {
        self.wait_fault = Some(reason.to_string());
        self
    }

    /// Snapshot of the recorded calls
    #[must_use]
    pub fn calls(&self) -> Vec<QueueCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: QueueCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DeviceQueue for MockQueue {
    fn acquire() -> Result<Self> {
        Ok(Self::new("mock:0"))
    }

    fn is_available() -> bool {
        true
    }

    fn device_name(&self) -> String {
        self.name.clone()
    }

    fn tracker(&self) -> &Arc<AllocTracker> {
        self.inner.tracker()
    }

    fn alloc_init<T: Element>(
        &self,
        len: usize,
        kind: AllocKind,
        init: &dyn Fn(usize) -> T,
    ) -> Result<DeviceBuffer<T>> {
        self.record(QueueCall::Alloc {
            dtype: T::DTYPE,
            len,
            kind,
        });
        self.inner.alloc_init(len, kind, init)
    }

    fn submit<T: Element>(
        &self,
        launch: &LaunchConfig,
        kernel: &dyn Kernel<T>,
        a: &DeviceBuffer<T>,
        b: &DeviceBuffer<T>,
        c: &mut DeviceBuffer<T>,
    ) -> Result<LaunchEvent> {
        self.record(QueueCall::Submit {
            kernel: kernel.name().to_string(),
            units: launch.units().unwrap_or(0),
            group_size: launch.group_size(),
        });

        if let Some(reason) = &self.submit_fault {
            return Err(CotejarError::DispatchFault {
                reason: reason.clone(),
            });
        }
        if let Some(reason) = &self.wait_fault {
            // Submission is accepted; the fault is discovered at wait
            return Ok(LaunchEvent::faulted(CotejarError::DispatchFault {
                reason: reason.clone(),
            }));
        }
        self.inner.submit(launch, kernel, a, b, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::VectorAdd;
    use crate::partition::IndexSpace;

    fn linear(len: usize, vl: usize) -> LaunchConfig {
        LaunchConfig::new(len, IndexSpace::Linear { vl })
    }

    #[test]
    fn test_cpu_queue_acquire() {
        assert!(CpuQueue::is_available());
        let queue = CpuQueue::acquire().unwrap();
        assert!(queue.device_name().starts_with("CPU reference device"));
    }

    #[test]
    fn test_cpu_queue_full_vadd() {
        let queue = CpuQueue::new();
        let launch = linear(64, 8);
        let a = queue
            .alloc_init(64, AllocKind::Shared, &|i| i32::from_index(i))
            .unwrap();
        let b = queue
            .alloc_init(64, AllocKind::Shared, &|i| i32::from_index(i))
            .unwrap();
        let mut c = queue.alloc_zeroed(64, AllocKind::Shared).unwrap();

        let event = queue.submit(&launch, &VectorAdd, &a, &b, &mut c).unwrap();
        event.wait().unwrap();

        for (i, &out) in c.as_slice().iter().enumerate() {
            assert_eq!(out, 2 * i as i32);
        }
    }

    #[test]
    fn test_cpu_queue_rejects_short_buffer() {
        let queue = CpuQueue::new();
        let launch = linear(64, 8);
        let a = queue.alloc_zeroed::<i32>(64, AllocKind::Shared).unwrap();
        let b = queue.alloc_zeroed::<i32>(32, AllocKind::Shared).unwrap();
        let mut c = queue.alloc_zeroed::<i32>(64, AllocKind::Shared).unwrap();

        let err = queue
            .submit(&launch, &VectorAdd, &a, &b, &mut c)
            .unwrap_err();
        assert!(matches!(err, CotejarError::InvalidShape { .. }));
    }

    #[test]
    fn test_cpu_queue_rejects_indivisible_partition() {
        let queue = CpuQueue::new();
        let launch = linear(60, 16);
        let a = queue.alloc_zeroed::<i32>(60, AllocKind::Shared).unwrap();
        let b = queue.alloc_zeroed::<i32>(60, AllocKind::Shared).unwrap();
        let mut c = queue.alloc_zeroed::<i32>(60, AllocKind::Shared).unwrap();

        let err = queue
            .submit(&launch, &VectorAdd, &a, &b, &mut c)
            .unwrap_err();
        assert!(matches!(err, CotejarError::InvalidPartition { .. }));
    }

    #[test]
    fn test_cpu_queue_empty_launch_completes() {
        let queue = CpuQueue::new();
        let launch = linear(0, 16);
        let a = queue.alloc_zeroed::<i32>(0, AllocKind::Shared).unwrap();
        let b = queue.alloc_zeroed::<i32>(0, AllocKind::Shared).unwrap();
        let mut c = queue.alloc_zeroed::<i32>(0, AllocKind::Shared).unwrap();

        let event = queue.submit(&launch, &VectorAdd, &a, &b, &mut c).unwrap();
        assert!(event.wait().is_ok());
    }

    #[test]
    fn test_mock_queue_records_calls() {
        let queue = MockQueue::new("mock-gpu:0");
        let launch = linear(32, 8);
        let a = queue
            .alloc_init(32, AllocKind::Device, &|i| i32::from_index(i))
            .unwrap();
        let b = queue
            .alloc_init(32, AllocKind::Device, &|i| i32::from_index(i))
            .unwrap();
        let mut c = queue.alloc_zeroed(32, AllocKind::Device).unwrap();
        let event = queue.submit(&launch, &VectorAdd, &a, &b, &mut c).unwrap();
        event.wait().unwrap();

        let calls = queue.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(
            calls[0],
            QueueCall::Alloc {
                dtype: Dtype::I32,
                len: 32,
                kind: AllocKind::Device,
            }
        );
        assert_eq!(
            calls[3],
            QueueCall::Submit {
                kernel: "vadd.linear".to_string(),
                units: 4,
                group_size: 1,
            }
        );
    }

    #[test]
    fn test_mock_queue_submit_fault() {
        let queue = MockQueue::new("mock:0").with_submit_fault("queue is wedged");
        let launch = linear(16, 4);
        let a = queue.alloc_zeroed::<i32>(16, AllocKind::Shared).unwrap();
        let b = queue.alloc_zeroed::<i32>(16, AllocKind::Shared).unwrap();
        let mut c = queue.alloc_zeroed::<i32>(16, AllocKind::Shared).unwrap();

        let err = queue
            .submit(&launch, &VectorAdd, &a, &b, &mut c)
            .unwrap_err();
        assert!(err.to_string().contains("queue is wedged"));
    }

    #[test]
    fn test_mock_queue_wait_fault_surfaces_at_wait() {
        let queue = MockQueue::new("mock:0").with_wait_fault("async launch died");
        let launch = linear(16, 4);
        let a = queue.alloc_zeroed::<i32>(16, AllocKind::Shared).unwrap();
        let b = queue.alloc_zeroed::<i32>(16, AllocKind::Shared).unwrap();
        let mut c = queue.alloc_zeroed::<i32>(16, AllocKind::Shared).unwrap();

        // Submission itself succeeds
        let event = queue.submit(&launch, &VectorAdd, &a, &b, &mut c).unwrap();
        let err = event.wait().unwrap_err();
        assert!(matches!(err, CotejarError::DispatchFault { .. }));
        assert!(err.to_string().contains("async launch died"));
    }

    #[test]
    fn test_tracker_zero_after_buffers_drop() {
        let queue = CpuQueue::new();
        {
            let _a = queue.alloc_zeroed::<i32>(8, AllocKind::Shared).unwrap();
            let _b = queue.alloc_zeroed::<i32>(8, AllocKind::Shared).unwrap();
            assert_eq!(queue.tracker().live(), 2);
        }
        assert_eq!(queue.tracker().live(), 0);
        assert_eq!(queue.tracker().total_allocated(), 2);
    }
}
