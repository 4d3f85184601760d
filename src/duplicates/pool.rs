//! Bounded worker pool used to build each pipeline stage.
//!
//! A [`WorkerPool`] owns a bounded channel and a fixed number of worker
//! threads that each run the same function against the receiving side.
//! Producers submit work through the pool (or through a cloned
//! [`Sender`]); when the channel is full they block, which is the only flow
//! control in the pipeline.
//!
//! [`WorkerPool::shutdown`] closes the pool's sending side and joins every
//! worker. Workers see the close only after the channel has been drained
//! and every other sender clone has been dropped, so no queued message is
//! lost. Each worker's return value is handed back to the caller, which
//! lets a stage own its state on its own thread and return it at the end.
//!
//! # Example
//!
//! ```
//! use twinfind::duplicates::WorkerPool;
//!
//! let pool = WorkerPool::spawn("sum", 4, 16, |rx: crossbeam_channel::Receiver<u64>| {
//!     rx.iter().sum::<u64>()
//! })
//! .unwrap();
//!
//! for i in 1..=100 {
//!     pool.submit(i).unwrap();
//! }
//!
//! let partials = pool.shutdown().unwrap();
//! assert_eq!(partials.len(), 4);
//! assert_eq!(partials.iter().sum::<u64>(), 5050);
//! ```

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

/// Default capacity of each bounded stage queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 512;

/// Errors raised by a worker pool.
#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    /// A worker thread could not be started.
    #[error("Failed to spawn worker for {name}: {source}")]
    Spawn {
        /// Name of the pool
        name: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Every worker has exited, so the queue no longer accepts work.
    #[error("Worker pool {0} is closed")]
    Closed(String),

    /// One or more workers panicked before finishing.
    #[error("{count} worker(s) in pool {name} panicked")]
    WorkerPanicked {
        /// Name of the pool
        name: String,
        /// Number of panicked workers
        count: usize,
    },
}

/// Fixed-size set of threads draining one bounded queue.
pub struct WorkerPool<T, R> {
    name: String,
    sender: Sender<T>,
    handles: Vec<JoinHandle<R>>,
}

impl<T, R> std::fmt::Debug for WorkerPool<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("workers", &self.handles.len())
            .field("queued", &self.sender.len())
            .finish()
    }
}

impl<T, R> WorkerPool<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Start `workers` threads (at least one), each running `work` against
    /// a queue holding up to `capacity` items (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] if a thread cannot be created. Workers
    /// that were already started are joined before the error is returned.
    pub fn spawn<F>(name: &str, workers: usize, capacity: usize, work: F) -> Result<Self, PoolError>
    where
        F: Fn(Receiver<T>) -> R + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        Self::start(name, workers, capacity, |index, receiver| {
            let work = Arc::clone(&work);
            thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || work(receiver))
        })
    }

    fn start<S>(
        name: &str,
        workers: usize,
        capacity: usize,
        mut start_worker: S,
    ) -> Result<Self, PoolError>
    where
        S: FnMut(usize, Receiver<T>) -> io::Result<JoinHandle<R>>,
    {
        let workers = workers.max(1);
        let (sender, receiver) = bounded(capacity.max(1));

        let mut pool = Self {
            name: name.to_string(),
            sender,
            handles: Vec::with_capacity(workers),
        };
        for index in 0..workers {
            match start_worker(index, receiver.clone()) {
                Ok(handle) => pool.handles.push(handle),
                Err(source) => {
                    log::error!("Failed to start worker {} of pool {}: {}", index, name, source);
                    return Err(pool.abandon(PoolError::Spawn {
                        name: name.to_string(),
                        source,
                    }));
                }
            }
        }

        log::debug!(
            "Started pool {} with {} worker(s), queue capacity {}",
            name,
            workers,
            capacity.max(1)
        );
        Ok(pool)
    }

    /// Queue one item, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] if every worker has already exited.
    pub fn submit(&self, item: T) -> Result<(), PoolError> {
        self.sender
            .send(item)
            .map_err(|_| PoolError::Closed(self.name.clone()))
    }

    /// A sending handle for producers running on other threads.
    ///
    /// Shutdown waits until every clone has been dropped.
    #[must_use]
    pub fn sender(&self) -> Sender<T> {
        self.sender.clone()
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Pool name used for thread names and diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Close the queue and wait for every worker to exit.
    ///
    /// Returns the workers' results in spawn order.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::WorkerPanicked`] if any worker panicked. All
    /// workers are joined before the error is reported.
    pub fn shutdown(self) -> Result<Vec<R>, PoolError> {
        let Self {
            name,
            sender,
            handles,
        } = self;
        drop(sender);

        let mut results = Vec::with_capacity(handles.len());
        let mut panicked = 0;
        for handle in handles {
            match handle.join() {
                Ok(result) => results.push(result),
                Err(_) => panicked += 1,
            }
        }

        if panicked > 0 {
            log::error!("{} worker(s) in pool {} panicked", panicked, name);
            return Err(PoolError::WorkerPanicked {
                name,
                count: panicked,
            });
        }

        log::debug!("Pool {} shut down", name);
        Ok(results)
    }

    /// Shut the pool down because a later step failed, and hand back that
    /// step's error.
    ///
    /// Worker results are discarded. A panicked worker is logged.
    pub fn abandon<E>(self, err: E) -> E {
        if let Err(shutdown_err) = self.shutdown() {
            log::warn!("{}", shutdown_err);
        }
        err
    }
}
