//! Compute backend trait and device abstraction.
//!
//! The [`ComputeBackend`] trait abstracts over execution environments so that
//! the field assembly in `strata-core` stays agnostic of how work items are
//! scheduled. All forward-modelling work is a flat index space (receivers,
//! frequencies or dipole elements), so the single primitive is a parallel
//! for-loop over `0..len`.

use thiserror::Error;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Work item {index} failed: {message}")]
    TaskFailed { index: usize, message: String },
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub compute_units: Option<usize>,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Serial,
    Cpu,
}

/// A work item: receives its index and reports failure as a [`ComputeError`].
pub type Task<'a> = dyn Fn(usize) -> Result<(), ComputeError> + Send + Sync + 'a;

/// Abstraction over compute backends.
///
/// Implementations must run every index in `0..len` exactly once and return
/// the first error encountered. No ordering between indices is promised, so
/// callers write results into disjoint slots.
pub trait ComputeBackend: Send + Sync {
    /// Return information about the device.
    fn device_info(&self) -> DeviceInfo;

    /// Number of work items that can run concurrently.
    fn num_workers(&self) -> usize {
        self.device_info().compute_units.unwrap_or(1)
    }

    /// Run `task(i)` for every `i` in `0..len`.
    fn parallel_for(&self, len: usize, task: &Task<'_>) -> Result<(), ComputeError>;
}
