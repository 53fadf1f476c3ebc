//! Bounded FIFO worker pool for workflows.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        WorkflowPool                          │
//! │                                                              │
//! │  submit(job) ──► unbounded queue ──► dispatcher task         │
//! │                                        │                     │
//! │                                        ▼                     │
//! │                              acquire permit (FIFO)           │
//! │                                        │                     │
//! │                                        ▼                     │
//! │                              spawn_blocking(job)             │
//! │                              permit released on exit         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The dispatcher takes one job at a time and waits for a free permit before
//! starting it, so jobs start in submission order and at most `workers` run
//! at once. With a single worker the pool executes jobs strictly one after
//! another.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};
use tracing::debug;

use crate::manager::{ManagerError, ManagerResult};

/// A unit of blocking work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Counters shared between the pool handle and its dispatcher.
#[derive(Debug, Default)]
struct PoolCounters {
    queued: AtomicUsize,
    active: AtomicUsize,
}

/// Marks a job as running for as long as it is alive.
struct ActiveGuard(Arc<PoolCounters>);

impl ActiveGuard {
    fn enter(counters: Arc<PoolCounters>) -> Self {
        counters.active.fetch_add(1, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A named pool of workers running blocking jobs in submission order.
#[derive(Debug)]
pub struct WorkflowPool {
    name: &'static str,
    workers: usize,
    jobs: mpsc::UnboundedSender<Job>,
    counters: Arc<PoolCounters>,
}

impl WorkflowPool {
    /// Start a pool with `workers` concurrent slots on the given runtime.
    ///
    /// A worker count of zero is treated as one.
    pub fn spawn(name: &'static str, workers: usize, runtime: &Handle) -> Self {
        let workers = workers.max(1);
        let (jobs, queue) = mpsc::unbounded_channel();
        let counters = Arc::new(PoolCounters::default());

        runtime.spawn(Self::dispatch(
            name,
            queue,
            Arc::new(Semaphore::new(workers)),
            Arc::clone(&counters),
        ));
        debug!(pool = name, workers, "Workflow pool started");

        Self {
            name,
            workers,
            jobs,
            counters,
        }
    }

    /// Queue a job.
    ///
    /// Fails only when the runtime backing the pool has shut down.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> ManagerResult<()> {
        self.counters.queued.fetch_add(1, Ordering::SeqCst);
        self.jobs.send(Box::new(job)).map_err(|_| {
            self.counters.queued.fetch_sub(1, Ordering::SeqCst);
            ManagerError::PoolClosed(self.name)
        })
    }

    /// Pool name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Maximum number of concurrently running jobs.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Jobs currently running.
    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.counters.queued.load(Ordering::SeqCst)
    }

    async fn dispatch(
        name: &'static str,
        mut queue: mpsc::UnboundedReceiver<Job>,
        permits: Arc<Semaphore>,
        counters: Arc<PoolCounters>,
    ) {
        while let Some(job) = queue.recv().await {
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            counters.queued.fetch_sub(1, Ordering::SeqCst);
            let running = ActiveGuard::enter(Arc::clone(&counters));

            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let _running = running;
                job();
            });
        }
        debug!(pool = name, "Workflow pool stopped");
    }
}
