//! Worker pool for artifact extraction.
//!
//! The pool is owned by the orchestrator rather than installed globally, so
//! several scans (and tests) can run side by side with their own sizing.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::ConfigError;

/// Half the reported cores, minimum 1.
pub fn default_workers() -> usize {
    std::cmp::max(1, num_cpus::get() / 2)
}

pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Build a pool with `workers` threads; `None` or `Some(0)` uses [`default_workers`].
    pub fn new(workers: Option<usize>) -> Result<Self, ConfigError> {
        let workers = workers.filter(|w| *w > 0).unwrap_or_else(default_workers);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("invoke-link-{}", i))
            .build()?;
        debug!(
            "Initialized worker pool: {} workers (system has {} cores)",
            workers,
            num_cpus::get()
        );
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `task` to every item on the pool and wait for all of them.
    ///
    /// Results come back in input order.
    pub fn run_all<T, R, F>(&self, items: &[T], task: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(|item| task(item)).collect())
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_sizing() {
        let pool = WorkerPool::new(None).unwrap();
        assert_eq!(pool.workers(), default_workers());
        assert!(pool.workers() >= 1);

        let pool = WorkerPool::new(Some(0)).unwrap();
        assert_eq!(pool.workers(), default_workers());
    }

    #[test]
    fn test_run_all_preserves_order_and_visits_everything() {
        let pool = WorkerPool::new(Some(3)).unwrap();
        let visited = AtomicUsize::new(0);
        let items: Vec<usize> = (0..100).collect();
        let doubled = pool.run_all(&items, |n| {
            visited.fetch_add(1, Ordering::Relaxed);
            n * 2
        });
        assert_eq!(visited.load(Ordering::Relaxed), 100);
        assert_eq!(doubled, (0..100).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_pools_are_independent() {
        let a = WorkerPool::new(Some(1)).unwrap();
        let b = WorkerPool::new(Some(2)).unwrap();
        assert_eq!(a.workers(), 1);
        assert_eq!(b.workers(), 2);
    }
}
