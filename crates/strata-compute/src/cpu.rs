//! CPU compute backend using Rayon for shared-memory parallelism.

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo, Task};

/// CPU backend that parallelises work across threads via Rayon.
///
/// Without an explicit thread count the global Rayon pool is used; with one,
/// the backend owns a dedicated pool of that size.
pub struct CpuBackend {
    num_threads: usize,
    pool: Option<ThreadPool>,
}

impl CpuBackend {
    /// Create a new CPU backend using all available threads.
    pub fn new() -> Self {
        Self {
            num_threads: rayon::current_num_threads(),
            pool: None,
        }
    }

    /// Create a CPU backend with a dedicated pool of `num_threads` threads.
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        let num_threads = num_threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("strata-worker-{i}"))
            .build()
            .map_err(|e| ComputeError::ThreadPool(e.to_string()))?;
        log::debug!("Built dedicated Rayon pool with {} threads", num_threads);
        Ok(Self {
            num_threads,
            pool: Some(pool),
        })
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: format!("CPU ({} threads)", self.num_threads),
            backend_type: BackendType::Cpu,
            compute_units: Some(self.num_threads),
        }
    }

    fn parallel_for(&self, len: usize, task: &Task<'_>) -> Result<(), ComputeError> {
        let run = || (0..len).into_par_iter().try_for_each(task);
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_visits_every_index_once() {
        let backend = CpuBackend::with_threads(4).unwrap();
        let hits: Vec<AtomicUsize> = (0..257).map(|_| AtomicUsize::new(0)).collect();
        backend
            .parallel_for(hits.len(), &|i| {
                hits[i].fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
            .unwrap();
        assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 1));
        assert_eq!(backend.num_workers(), 4);
    }

    #[test]
    fn test_propagates_errors() {
        let backend = CpuBackend::new();
        let result = backend.parallel_for(64, &|i| {
            if i == 17 {
                Err(ComputeError::TaskFailed {
                    index: i,
                    message: "bad".into(),
                })
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(ComputeError::TaskFailed { index: 17, .. })));
    }
}
