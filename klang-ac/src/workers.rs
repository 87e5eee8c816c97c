//! Bounded CPU worker pool
//!
//! Decoding, resampling, statistics, and inference are CPU-bound and must
//! not stall the request executor. `CpuPool` submits closures to the
//! blocking thread pool, with a semaphore capping how many run at once;
//! submitters suspend until a permit and the result are available.

use std::sync::Arc;

use tokio::sync::Semaphore;

use klang_common::{Error, Result};

/// Handle to the bounded pool; clones share the same permit budget.
#[derive(Clone)]
pub struct CpuPool {
    permits: Arc<Semaphore>,
}

impl CpuPool {
    /// Pool allowing at most `workers` concurrent jobs (minimum 1).
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Run `job` on the blocking pool, suspending until it completes.
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Internal("worker pool closed".to_string()))?;

        let outcome = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| Error::Internal(format!("worker job panicked: {}", e)))?;

        outcome
    }
}
