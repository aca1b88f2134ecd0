//! Buffers and allocation accounting
//!
//! A [`DeviceBuffer`] is a flat, exclusively-owned sequence of elements
//! created through a queue, populated at allocation time via an
//! `(index) -> value` function, and released when dropped. Release is
//! unconditional: the harness relies on ownership, so buffers are freed on
//! the fault path exactly as on the success path.
//!
//! Every buffer holds a handle to its queue's [`AllocTracker`], which
//! counts live and total allocations. The tracker is what makes the
//! no-leak property assertable under fault injection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::element::Element;

/// Where an allocation lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocKind {
    /// Host-visible shared allocation
    Shared,
    /// Device-resident allocation
    Device,
}

/// Live/total allocation counters for one queue
#[derive(Debug, Default)]
pub struct AllocTracker {
    live: AtomicUsize,
    total: AtomicUsize,
}

impl AllocTracker {
    /// Create a tracker with zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffers currently alive
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Number of buffers ever allocated
    #[must_use]
    pub fn total_allocated(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    fn on_alloc(&self) {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn on_release(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A flat numeric buffer owned by one test for its entire duration
#[derive(Debug)]
pub struct DeviceBuffer<T: Element> {
    data: Vec<T>,
    kind: AllocKind,
    tracker: Arc<AllocTracker>,
}

impl<T: Element> DeviceBuffer<T> {
    /// Allocate and initialize each element from its index
    ///
    /// Buffers are normally created through [`crate::queue::DeviceQueue`];
    /// this constructor exists for queue implementations.
    #[must_use]
    pub fn with_init(
        len: usize,
        kind: AllocKind,
        tracker: Arc<AllocTracker>,
        init: &dyn Fn(usize) -> T,
    ) -> Self {
        let data = (0..len).map(init).collect();
        tracker.on_alloc();
        Self {
            data,
            kind,
            tracker,
        }
    }

    /// Allocate zero-initialized (the output-buffer case)
    #[must_use]
    pub fn zeroed(len: usize, kind: AllocKind, tracker: Arc<AllocTracker>) -> Self {
        Self::with_init(len, kind, tracker, &|_| T::ZERO)
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocation kind
    #[must_use]
    pub fn kind(&self) -> AllocKind {
        self.kind
    }

    /// Read view of the elements
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Write view of the elements
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: Element> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        self.tracker.on_release();
    }
}
