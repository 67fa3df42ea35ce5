use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Semaphore, SemaphorePermit};

use crate::protocol::{WorkerCommand, WorkerReply};
use crate::types::{SymbolicError, SymbolicPoolConfig};
use crate::worker::SymbolicWorker;

/// Pool of symbolic worker processes with semaphore-based concurrency control.
///
/// The pool keeps a free list of workers and a semaphore with one permit
/// per worker, so at most `num_workers` equivalence checks run at once and
/// callers beyond that wait without blocking the runtime. Workers are
/// recycled on checkout when they exceed their request or lifetime limit,
/// or when their process died on a previous request.
pub struct SymbolicPool {
    workers: Mutex<Vec<SymbolicWorker>>,
    semaphore: Arc<Semaphore>,
    config: SymbolicPoolConfig,
}

impl SymbolicPool {
    /// Create a new pool, spawning `config.num_workers` worker processes.
    pub async fn new(config: SymbolicPoolConfig) -> Result<Self, SymbolicError> {
        if config.num_workers == 0 {
            return Err(SymbolicError::Protocol(
                "num_workers must be at least 1".into(),
            ));
        }

        let mut workers = Vec::with_capacity(config.num_workers);
        for _ in 0..config.num_workers {
            workers.push(SymbolicWorker::spawn(&config).await?);
        }

        let num = config.num_workers;
        tracing::info!(num_workers = num, "Symbolic pool initialized");

        Ok(Self {
            workers: Mutex::new(workers),
            semaphore: Arc::new(Semaphore::new(num)),
            config,
        })
    }

    /// Acquire a worker from the pool, recycling if needed.
    async fn acquire(&self) -> Result<(SymbolicWorker, SemaphorePermit<'_>), SymbolicError> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| SymbolicError::Protocol("Pool is shut down".into()))?;

        let mut worker = self
            .lock_workers()
            .pop()
            .ok_or_else(|| SymbolicError::Protocol("No workers available despite permit".into()))?;

        if worker.needs_recycling() {
            tracing::debug!(
                requests = worker.requests_handled(),
                dead = worker.is_dead(),
                "Recycling worker on checkout"
            );
            if let Err(e) = worker.recycle().await {
                // Keep the slot; the next checkout retries the respawn.
                Self::return_worker_sync(&self.workers, worker);
                return Err(e);
            }
        }

        Ok((worker, permit))
    }

    fn lock_workers(&self) -> std::sync::MutexGuard<'_, Vec<SymbolicWorker>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return a worker to the free list (synchronous, used from Drop).
    fn return_worker_sync(workers: &Mutex<Vec<SymbolicWorker>>, worker: SymbolicWorker) {
        workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(worker);
    }

    /// Check out a worker for exclusive use. The returned guard releases
    /// the worker back to the pool when dropped.
    pub async fn checkout(&self) -> Result<WorkerGuard<'_>, SymbolicError> {
        let (worker, permit) = self.acquire().await?;
        Ok(WorkerGuard {
            worker: Some(worker),
            pool_workers: &self.workers,
            _permit: permit,
        })
    }

    /// Run one command on the next free worker.
    pub async fn submit(&self, command: &WorkerCommand) -> Result<WorkerReply, SymbolicError> {
        let mut guard = self.checkout().await?;
        guard.worker()?.send(command).await
    }

    /// Number of workers currently available (not checked out).
    pub fn available_workers(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Total number of workers in the pool.
    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    pub fn config(&self) -> &SymbolicPoolConfig {
        &self.config
    }

    /// Shut down the pool: refuse new checkouts and kill every idle worker.
    /// Workers still checked out are killed when their guard drops them.
    pub async fn shutdown(&self) {
        self.semaphore.close();
        let drained: Vec<SymbolicWorker> = std::mem::take(&mut *self.lock_workers());
        let count = drained.len();
        for mut worker in drained {
            worker.shutdown().await;
        }
        tracing::info!(workers = count, "Symbolic pool shut down");
    }
}

/// RAII guard that holds a worker checked out from the pool.
pub struct WorkerGuard<'a> {
    worker: Option<SymbolicWorker>,
    pool_workers: &'a Mutex<Vec<SymbolicWorker>>,
    _permit: SemaphorePermit<'a>,
}

impl<'a> WorkerGuard<'a> {
    /// Get a mutable reference to the underlying worker.
    pub fn worker(&mut self) -> Result<&mut SymbolicWorker, SymbolicError> {
        self.worker
            .as_mut()
            .ok_or_else(|| SymbolicError::Protocol("worker already taken".into()))
    }
}

impl<'a> Drop for WorkerGuard<'a> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            SymbolicPool::return_worker_sync(self.pool_workers, worker);
        }
    }
}
