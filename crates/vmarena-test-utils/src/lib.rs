//! Test utilities for vmarena development.
//!
//! Provides [`RecordingAllocator`], a wrapper that logs every operation it
//! forwards to an inner allocator, and [`init_tracing`] for wiring `tracing`
//! output into the test harness.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::cell::RefCell;
use std::ptr::NonNull;
use std::sync::Once;

use vmarena_core::{AllocError, AllocOp, Allocator};

/// One forwarded operation, as seen by [`RecordingAllocator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub op: AllocOp,
    /// Requested size: `size` for Allocate/Free, `new_size` for Resize, 0 for Clear.
    pub size: usize,
    /// Whether the inner allocator reported success.
    pub ok: bool,
}

/// Forwards to `A` and records every call.
///
/// Pair with any backend to assert on the exact sequence of
/// Allocate/Resize/Free/Clear a consumer issues.
pub struct RecordingAllocator<A> {
    inner: A,
    calls: RefCell<Vec<Call>>,
}

impl<A: Allocator> RecordingAllocator<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Snapshot of the calls recorded so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Number of recorded calls of kind `op`.
    pub fn count(&self, op: AllocOp) -> usize {
        self.calls.borrow().iter().filter(|c| c.op == op).count()
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    fn record<T>(&self, op: AllocOp, size: usize, result: &Result<T, AllocError>) {
        self.calls.borrow_mut().push(Call {
            op,
            size,
            ok: result.is_ok(),
        });
    }
}

impl<A: Allocator> Allocator for RecordingAllocator<A> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn alignment(&self) -> usize {
        self.inner.alignment()
    }

    fn try_allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let result = self.inner.try_allocate(size);
        self.record(AllocOp::Allocate, size, &result);
        result
    }

    fn try_resize(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        let result = self.inner.try_resize(ptr, old_size, new_size);
        self.record(AllocOp::Resize, new_size, &result);
        result
    }

    fn try_free(&self, ptr: NonNull<u8>, size: usize) -> Result<(), AllocError> {
        let result = self.inner.try_free(ptr, size);
        self.record(AllocOp::Free, size, &result);
        result
    }

    fn try_clear(&self) -> Result<(), AllocError> {
        let result = self.inner.try_clear();
        self.record(AllocOp::Clear, 0, &result);
        result
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honours `RUST_LOG`; defaults to `warn`. Safe to call from every test.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
