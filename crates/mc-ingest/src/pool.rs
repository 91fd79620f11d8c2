//! Bounded worker pools.
//!
//! A pool is an admission gate: a semaphore sized from config. CPU-bound
//! closures run on tokio's blocking threads while holding a permit;
//! subprocess-bound futures are awaited while holding a permit.

use std::future::Future;
use std::sync::Arc;

use mc_core::config::ProcessingConfig;
use mc_core::{Error, Result};
use tokio::sync::Semaphore;

/// A named, explicitly sized pool.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: &'static str,
    size: usize,
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    /// Create a pool admitting `size` jobs at once (at least one).
    pub fn new(name: &'static str, size: usize) -> Self {
        let size = size.max(1);
        Self {
            name,
            size,
            semaphore: Arc::new(Semaphore::new(size)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run a blocking closure once a slot is free.
    pub async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::Internal(format!("{} pool closed", self.name)))?;

        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| Error::Internal(format!("{} pool join error: {e}", self.name)))?
    }

    /// Await `fut` once a slot is free, holding the slot until it resolves.
    pub async fn run<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::Internal(format!("{} pool closed", self.name)))?;
        fut.await
    }
}

/// The process-wide image and video pools.
#[derive(Debug, Clone)]
pub struct WorkerPools {
    pub image: WorkerPool,
    pub video: WorkerPool,
}

impl WorkerPools {
    pub fn new(image_workers: usize, video_workers: usize) -> Self {
        Self {
            image: WorkerPool::new("image", image_workers),
            video: WorkerPool::new("video", video_workers),
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(config.image_workers, config.video_workers)
    }
}
