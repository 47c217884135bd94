//! Single-threaded backend: runs work items in index order on the caller.

use crate::backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo, Task};

/// Backend that executes every work item sequentially.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialBackend;

impl ComputeBackend for SerialBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Serial".into(),
            backend_type: BackendType::Serial,
            compute_units: Some(1),
        }
    }

    fn parallel_for(&self, len: usize, task: &Task<'_>) -> Result<(), ComputeError> {
        (0..len).try_for_each(task)
    }
}
