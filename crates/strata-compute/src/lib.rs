//! # Strata Compute
//!
//! Compute backend abstraction for the Strata framework. This crate
//! provides a [`ComputeBackend`](backend::ComputeBackend) trait that isolates
//! the physics code from how work items are scheduled.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Status |
//! |---------|-------------|--------|
//! | Serial | always | Implemented |
//! | CPU (Rayon) | `cpu` (default) | Implemented |

pub mod backend;
pub mod serial;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo, Task};
pub use serial::SerialBackend;

#[cfg(feature = "cpu")]
pub use cpu::CpuBackend;
