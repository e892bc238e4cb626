// Concurrent execution engine for asynchronous I/O.
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2021-2025 by
//     Dr. Maxim Orlovsky <orlovsky@ubideco.org>
//     Alexis Sellier <alexis@cloudhead.io>
//
// Copyright 2022-2025 UBIDECO Labs, InDCS, Lugano, Switzerland. All Rights reserved.
// Copyright 2021-2023 Alexis Sellier <alexis@cloudhead.io>. All Rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

//! Fixed-size worker thread pool.

#![allow(unused_variables)] // because we need them for feature-gated logger

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crate::event::Event;
use crate::queue::TaskQueue;
use crate::submitter::Submitter;
use crate::sync::{check_name, CondVar, Lock, SyncError, Thread};
use crate::task::{Task, TaskHandle};

/// Number of worker threads used by [`PoolConfig::default`].
pub const DEFAULT_THREADS: usize = 4;

/// Prefix of worker thread names used by [`PoolConfig::default`].
pub const DEFAULT_NAME: &str = "maio-worker";

/// Thread pool errors
#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum Error {
    /// thread pool must run at least one worker thread.
    NoWorkers,

    /// thread pool is shutting down and doesn't accept new tasks.
    ShuttingDown,

    /// task has terminated without producing a value.
    TaskLost,

    /// synchronization failure. Details: {0}
    #[from]
    Sync(SyncError),
}

/// Thread pool configuration.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PoolConfig {
    /// Number of worker threads; must be non-zero.
    pub threads: usize,
    /// Prefix of worker thread names; workers are named `{name}-{index}`.
    pub name: String,
    /// Stack size for worker threads. Uses the platform default if not set.
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            threads: DEFAULT_THREADS,
            name: DEFAULT_NAME.to_owned(),
            stack_size: None,
        }
    }
}

/// Statistics of a single worker collected over its lifetime.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct WorkerReport {
    /// Number of tasks the worker has run, including the ones which panicked.
    pub executed: usize,
    /// Number of tasks which panicked.
    pub panicked: usize,
}

/// Result of a completed [`ThreadPool::shutdown`], with one entry per terminated worker.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ShutdownReport {
    pub workers: Vec<WorkerReport>,
}

impl ShutdownReport {
    pub fn executed(&self) -> usize { self.workers.iter().map(|w| w.executed).sum() }

    pub fn panicked(&self) -> usize { self.workers.iter().map(|w| w.panicked).sum() }
}

struct State {
    queue: TaskQueue<Task>,
    /// Once set, never cleared.
    shutdown: bool,
}

/// State shared by the pool, its workers and all [`Submitter`]s.
pub(crate) struct Shared {
    state: Lock<State>,
    notify: CondVar,
}

impl Shared {
    fn new() -> Self {
        Shared {
            state: Lock::new(State {
                queue: TaskQueue::new(),
                shutdown: false,
            }),
            notify: CondVar::new(),
        }
    }

    pub(crate) fn submit(&self, task: Task) -> Result<(), Error> {
        let mut state = self.state.lock()?;
        if state.shutdown {
            #[cfg(feature = "log")]
            log::debug!(target: "pool", "Rejecting task submitted during shutdown");
            return Err(Error::ShuttingDown);
        }
        state.queue.push(task);
        self.notify.signal();
        #[cfg(feature = "log")]
        log::trace!(target: "pool", "Task queued ({} pending)", state.queue.len());
        Ok(())
    }

    /// A pool whose lock got poisoned can't accept tasks and is reported as shutting down.
    pub(crate) fn is_shutting_down(&self) -> bool {
        self.state.lock().map(|state| state.shutdown).unwrap_or(true)
    }

    fn queued(&self) -> Result<usize, Error> { Ok(self.state.lock()?.queue.len()) }

    fn request_shutdown(&self) -> Result<(), Error> {
        let res = self.state.lock().map(|mut state| state.shutdown = true);
        // Workers blocked on a poisoned lock must still wake up and exit.
        self.notify.broadcast();
        res.map_err(Error::from)
    }
}

/// Pool of worker threads executing submitted tasks in FIFO order.
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// use maio::ThreadPool;
///
/// let pool = ThreadPool::new(4).unwrap();
/// let counter = Arc::new(AtomicUsize::new(0));
/// for _ in 0..100 {
///     let counter = counter.clone();
///     pool.submit(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })
///     .unwrap();
/// }
/// let report = pool.shutdown().unwrap();
/// assert_eq!(counter.load(Ordering::SeqCst), 100);
/// assert_eq!(report.workers.len(), 4);
/// ```
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<Thread<Result<WorkerReport, Error>>>,
}

impl ThreadPool {
    /// Creates a pool running `threads` workers with default naming.
    ///
    /// # Error
    ///
    /// Errors with [`Error::NoWorkers`] if `threads` is zero and with a system/OS error if it was
    /// impossible to spawn a worker thread.
    pub fn new(threads: usize) -> Result<Self, Error> {
        ThreadPool::with(PoolConfig {
            threads,
            ..PoolConfig::default()
        })
    }

    /// Similar to the [`ThreadPool::new`], but allows to specify the prefix for worker thread
    /// names.
    ///
    /// # Error
    ///
    /// Errors with [`SyncError::InvalidName`] if the prefix contains a NUL byte.
    pub fn named(threads: usize, name: impl Into<String>) -> Result<Self, Error> {
        ThreadPool::with(PoolConfig {
            threads,
            name: name.into(),
            ..PoolConfig::default()
        })
    }

    /// Creates a pool from a fully custom configuration.
    ///
    /// If one of the workers fails to spawn, the workers spawned before it are shut down and
    /// joined before the error is returned.
    pub fn with(config: PoolConfig) -> Result<Self, Error> {
        if config.threads == 0 {
            return Err(Error::NoWorkers);
        }
        check_name(&config.name)?;

        #[cfg(feature = "log")]
        log::debug!(target: "pool", "Spawning {} worker threads...", config.threads);

        let mut pool = ThreadPool {
            shared: Arc::new(Shared::new()),
            workers: Vec::with_capacity(config.threads),
        };
        for index in 0..config.threads {
            let mut builder = thread::Builder::new().name(format!("{}-{index}", config.name));
            if let Some(size) = config.stack_size {
                builder = builder.stack_size(size);
            }
            let shared = pool.shared.clone();
            // On error `pool` is dropped, which terminates the workers spawned so far.
            let worker = Thread::with(builder, move || worker_loop(shared, index))?;
            pool.workers.push(worker);
        }

        #[cfg(feature = "log")]
        log::info!(target: "pool", "Thread pool `{}` is running {} workers", config.name, config.threads);

        Ok(pool)
    }

    /// Schedules `f` for execution on one of the workers.
    ///
    /// A task is guaranteed to run before [`ThreadPool::shutdown`] returns if and only if this
    /// method has returned `Ok`.
    pub fn submit<F>(&self, f: F) -> Result<(), Error>
    where F: FnOnce() + Send + 'static {
        self.shared.submit(Task::new(f))
    }

    /// Schedules `f` for execution and returns a handle to its result.
    pub fn spawn<F, T>(&self, f: F) -> Result<TaskHandle<T>, Error>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (task, handle) = TaskHandle::wrap(f);
        self.shared.submit(task)?;
        Ok(handle)
    }

    /// Hands the event over to a worker, which fires it.
    pub fn submit_event<A, H>(&self, event: Event<A, H>) -> Result<(), Error>
    where
        A: Send + 'static,
        H: Send + 'static,
    {
        self.submit(move || event.fire())
    }

    /// Provides a [`Submitter`] which can schedule tasks from other threads, including from
    /// inside the tasks themselves.
    pub fn submitter(&self) -> Submitter { Submitter::new(self.shared.clone()) }

    /// Number of worker threads.
    pub fn threads(&self) -> usize { self.workers.len() }

    /// Number of tasks waiting for a worker.
    pub fn queued(&self) -> Result<usize, Error> { self.shared.queued() }

    pub fn is_shutting_down(&self) -> bool { self.shared.is_shutting_down() }

    /// Stops accepting tasks, waits for all queued tasks to complete and joins all workers.
    ///
    /// # Blocking
    ///
    /// This call is blocking.
    pub fn shutdown(mut self) -> Result<ShutdownReport, Error> { self.terminate() }

    fn terminate(&mut self) -> Result<ShutdownReport, Error> {
        #[cfg(feature = "log")]
        log::info!(target: "pool", "Initiating thread pool shutdown...");

        let mut failure = self.shared.request_shutdown().err();
        let mut report = ShutdownReport::default();
        for worker in self.workers.drain(..) {
            match worker.join() {
                Ok(Ok(worker_report)) => report.workers.push(worker_report),
                Ok(Err(err)) => {
                    #[cfg(feature = "log")]
                    log::error!(target: "pool", "Worker has failed: {err}");
                    failure = failure.or(Some(err));
                }
                Err(err) => {
                    #[cfg(feature = "log")]
                    log::error!(target: "pool", "Unable to join worker: {err}");
                    failure = failure.or(Some(err.into()));
                }
            }
        }

        #[cfg(feature = "log")]
        log::info!(target: "pool", "Thread pool has terminated after running {} tasks", report.executed());

        match failure {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        if let Err(err) = self.terminate() {
            #[cfg(feature = "log")]
            log::error!(target: "pool", "Thread pool shutdown on drop has failed: {err}");
        }
    }
}

fn worker_loop(shared: Arc<Shared>, index: usize) -> Result<WorkerReport, Error> {
    #[cfg(feature = "log")]
    log::debug!(target: "worker", "Worker {index} has started");

    let mut report = WorkerReport::default();
    loop {
        let task = {
            let mut state = shared.state.lock()?;
            loop {
                if let Some(task) = state.queue.pop() {
                    break Some(task);
                }
                if state.shutdown {
                    break None;
                }
                state = shared.notify.wait(state)?;
            }
        };
        let Some(task) = task else {
            break;
        };

        #[cfg(feature = "log")]
        log::trace!(target: "worker", "Worker {index} is running a task");

        report.executed += 1;
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            report.panicked += 1;
            #[cfg(feature = "log")]
            log::error!(target: "worker", "Task on worker {index} has panicked: {}", crate::sync::panic_message(payload.as_ref()));
        }
    }

    #[cfg(feature = "log")]
    log::debug!(target: "worker", "Worker {index} has terminated after running {} tasks", report.executed);

    Ok(report)
}
