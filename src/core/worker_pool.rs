//! Bounded pool for download jobs.
//!
//! Handlers submit a job and return immediately so the dispatcher keeps accepting
//! updates; at most `capacity` jobs run at once and the rest wait for a permit.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held by a running job.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Spawns `job`; it starts once a permit is free and holds it until it finishes.
    pub fn spawn<F>(&self, name: String, job: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        tokio::spawn(async move {
            // Acquire permit from semaphore (will wait if all permits are taken)
            let _permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(e) => {
                    log::error!("Failed to acquire worker permit for job {}: {}", name, e);
                    return;
                }
            };
            log::info!("Worker started job {}", name);
            job.await;
            log::info!("Worker finished job {}", name);
        })
    }
}
