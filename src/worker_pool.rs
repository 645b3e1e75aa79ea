//! # Worker Pool Module
//!
//! A fixed set of `may` coroutines sharing one unbounded queue. The HTTP listener pushes each
//! accepted request into the queue; whichever worker is free picks it up and runs the whole
//! request pipeline for it, so one request never waits on another.
//!
//! ## Features
//!
//! - **Shared queue**: every worker holds its own receiver of one `may::sync::mpmc` channel,
//!   so each queued item is taken by exactly one free worker
//! - **Panic isolation**: a job that panics is logged and the worker keeps serving
//! - **Graceful shutdown**: [`WorkerPool::shutdown`] queues one stop message per worker behind
//!   the jobs already accepted, then joins them
//! - **Metrics**: queue depth, dispatched and completed counts
//!
//! ## Configuration
//!
//! `num_workers` (default 16) and `stack_size` (default `0x10000`) come from the `workers`
//! section of the server configuration and may be overridden by `CTLR_WORKERS` and
//! `CTLR_STACK_SIZE`, see [`crate::runtime_config`].

use may::coroutine::JoinHandle;
use may::sync::mpmc;
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Configuration for a worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of worker coroutines
    pub num_workers: usize,
    /// Stack size for worker coroutines in bytes
    pub stack_size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 16,
            stack_size: 0x10000, // 64KB
        }
    }
}

/// Metrics for a worker pool
#[derive(Debug, Default)]
pub struct WorkerPoolMetrics {
    /// Jobs queued but not yet finished (approximate)
    pub queue_depth: AtomicUsize,
    /// Total jobs submitted
    pub dispatched_count: AtomicU64,
    /// Total jobs finished, including ones that panicked
    pub completed_count: AtomicU64,
}

impl WorkerPoolMetrics {
    pub fn record_dispatch(&self) {
        self.dispatched_count.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.fetch_sub(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get_queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get_dispatched_count(&self) -> u64 {
        self.dispatched_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get_completed_count(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerPoolError {
    /// `num_workers` was zero
    NoWorkers,
    /// A worker coroutine could not be spawned
    Spawn(String),
    /// The pool has been shut down
    Closed,
}

impl fmt::Display for WorkerPoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerPoolError::NoWorkers => write!(f, "worker pool needs at least one worker"),
            WorkerPoolError::Spawn(e) => write!(f, "failed to spawn worker coroutine: {e}"),
            WorkerPoolError::Closed => write!(f, "worker pool is shut down"),
        }
    }
}

impl std::error::Error for WorkerPoolError {}

enum Message<T> {
    Job(T),
    Stop,
}

/// Coroutine pool running one job per queued item
pub struct WorkerPool<T: Send + 'static> {
    name: String,
    config: WorkerPoolConfig,
    sender: Option<mpmc::Sender<Message<T>>>,
    workers: Vec<JoinHandle<()>>,
    metrics: Arc<WorkerPoolMetrics>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawn `config.num_workers` coroutines, each running `job` for the items it receives
    pub fn new<F>(name: impl Into<String>, config: WorkerPoolConfig, job: F) -> Result<Self, WorkerPoolError>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        if config.num_workers == 0 {
            return Err(WorkerPoolError::NoWorkers);
        }
        let name = name.into();
        let (tx, rx) = mpmc::channel::<Message<T>>();
        let job = Arc::new(job);
        let metrics = Arc::new(WorkerPoolMetrics::default());

        info!(
            pool = %name,
            num_workers = config.num_workers,
            stack_size = config.stack_size,
            "Creating worker pool"
        );

        let mut workers = Vec::with_capacity(config.num_workers);
        for worker_id in 0..config.num_workers {
            let rx = rx.clone();
            let job = Arc::clone(&job);
            let metrics = Arc::clone(&metrics);
            let pool = name.clone();

            // SAFETY: `Builder::spawn` is unsafe because a coroutine must not block the
            // scheduler thread on thread-local state it does not own. The closure only
            // touches its receiver, the job and atomics. Socket IO stays on the listener's
            // OS threads.
            #[allow(unsafe_code)]
            let spawned = unsafe {
                may::coroutine::Builder::new()
                    .name(format!("{pool}-{worker_id}"))
                    .stack_size(config.stack_size)
                    .spawn(move || {
                        debug!(pool = %pool, worker_id, "Worker coroutine started");
                        while let Ok(Message::Job(item)) = rx.recv() {
                            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(
                                || job(item),
                            ));
                            if let Err(panic) = outcome {
                                error!(
                                    pool = %pool,
                                    worker_id,
                                    panic_message = ?panic,
                                    "Worker job panicked"
                                );
                            }
                            metrics.record_completion();
                        }
                        debug!(pool = %pool, worker_id, "Worker coroutine exiting");
                    })
            };

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!(pool = %name, worker_id, error = %e, "Failed to spawn worker coroutine");
                    for _ in &workers {
                        let _ = tx.send(Message::Stop);
                    }
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(WorkerPoolError::Spawn(e.to_string()));
                }
            }
        }

        Ok(Self {
            name,
            config,
            sender: Some(tx),
            workers,
            metrics,
        })
    }

    /// Queue `item` for the next free worker
    pub fn submit(&self, item: T) -> Result<(), WorkerPoolError> {
        self.submitter()?.submit(item)
    }

    /// A cloneable handle for queueing from other threads
    pub fn submitter(&self) -> Result<Submitter<T>, WorkerPoolError> {
        let sender = self.sender.as_ref().ok_or(WorkerPoolError::Closed)?;
        Ok(Submitter {
            pool: self.name.clone(),
            sender: sender.clone(),
            metrics: Arc::clone(&self.metrics),
        })
    }

    /// Let workers finish the jobs already queued, then stop and join them
    ///
    /// Submitters that outlive the pool get [`WorkerPoolError::Closed`] once the workers are gone.
    pub fn shutdown(&mut self) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        for _ in &self.workers {
            if sender.send(Message::Stop).is_err() {
                break;
            }
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!(pool = %self.name, "Worker coroutine terminated abnormally");
            }
        }
        info!(
            pool = %self.name,
            completed = self.metrics.get_completed_count(),
            "Worker pool shut down"
        );
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<WorkerPoolMetrics> {
        &self.metrics
    }

    #[must_use]
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }
}

/// Queueing side of a [`WorkerPool`]
pub struct Submitter<T: Send + 'static> {
    pool: String,
    sender: mpmc::Sender<Message<T>>,
    metrics: Arc<WorkerPoolMetrics>,
}

impl<T: Send + 'static> Clone for Submitter<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            sender: self.sender.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<T: Send + 'static> Submitter<T> {
    pub fn submit(&self, item: T) -> Result<(), WorkerPoolError> {
        self.metrics.record_dispatch();
        self.sender.send(Message::Job(item)).map_err(|_| {
            self.metrics.record_completion();
            error!(pool = %self.pool, "Worker pool channel disconnected");
            WorkerPoolError::Closed
        })
    }
}

impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
