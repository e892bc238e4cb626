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

//! Synchronization primitives the worker pool is built on.
//!
//! Each primitive is initialized by construction and destroyed on drop, so a primitive can't be
//! used before it is initialized, initialized twice or destroyed while a thread is blocked on it.
//! Lock/unlock pairing is tied to the lifetime of the returned guard.

use std::any::Any;
use std::sync::{self, Condvar, MutexGuard, RwLockReadGuard, RwLockWriteGuard, TryLockError};
use std::thread::JoinHandle;
use std::{io, thread};

/// Guard of an acquired [`Lock`]; the lock is released when the guard is dropped.
pub type LockGuard<'a, T> = MutexGuard<'a, T>;
/// Shared access guard of a [`RwLock`].
pub type ReadGuard<'a, T> = RwLockReadGuard<'a, T>;
/// Exclusive access guard of a [`RwLock`].
pub type WriteGuard<'a, T> = RwLockWriteGuard<'a, T>;

/// Errors of the synchronization primitives.
#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum SyncError {
    /// {0} is poisoned by a thread which has panicked while holding it.
    Poisoned(&'static str),

    /// unable to spawn a thread. Details: {0}
    #[from]
    Spawn(io::Error),

    /// thread `{0}` has terminated with a panic: {1}
    Panicked(String, String),

    /// thread name {0:?} contains a NUL byte.
    InvalidName(String),
}

/// Exclusive lock protecting a value of type `T`.
#[derive(Debug, Default)]
pub struct Lock<T>(sync::Mutex<T>);

impl<T> Lock<T> {
    pub fn new(value: T) -> Self { Self(sync::Mutex::new(value)) }

    /// Blocks the current thread until the lock is acquired.
    pub fn lock(&self) -> Result<LockGuard<'_, T>, SyncError> {
        self.0.lock().map_err(|_| SyncError::Poisoned("lock"))
    }

    /// Acquires the lock if it is free; returns `Ok(None)` if it is held by any thread, including
    /// the current one.
    pub fn try_lock(&self) -> Result<Option<LockGuard<'_, T>>, SyncError> {
        match self.0.try_lock() {
            Ok(guard) => Ok(Some(guard)),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Poisoned(_)) => Err(SyncError::Poisoned("lock")),
        }
    }

    pub fn into_inner(self) -> Result<T, SyncError> {
        self.0.into_inner().map_err(|_| SyncError::Poisoned("lock"))
    }
}

/// Condition variable paired with a [`Lock`].
#[derive(Debug, Default)]
pub struct CondVar(Condvar);

impl CondVar {
    pub fn new() -> Self { Self(Condvar::new()) }

    /// Atomically releases the lock behind `guard` and blocks until the condition variable is
    /// signalled. The lock is re-acquired before returning.
    ///
    /// Wake-ups may be spurious: callers must re-check their condition after each return.
    pub fn wait<'a, T>(&self, guard: LockGuard<'a, T>) -> Result<LockGuard<'a, T>, SyncError> {
        self.0.wait(guard).map_err(|_| SyncError::Poisoned("lock"))
    }

    /// Blocks while `condition` returns `true`, re-checking it on every wake-up.
    pub fn wait_while<'a, T, F>(
        &self,
        guard: LockGuard<'a, T>,
        condition: F,
    ) -> Result<LockGuard<'a, T>, SyncError>
    where
        F: FnMut(&mut T) -> bool,
    {
        self.0.wait_while(guard, condition).map_err(|_| SyncError::Poisoned("lock"))
    }

    /// Wakes up at least one blocked waiter.
    pub fn signal(&self) { self.0.notify_one() }

    /// Wakes up all blocked waiters.
    pub fn broadcast(&self) { self.0.notify_all() }
}

/// Reader-writer lock: many readers or a single writer.
#[derive(Debug, Default)]
pub struct RwLock<T>(sync::RwLock<T>);

impl<T> RwLock<T> {
    pub fn new(value: T) -> Self { Self(sync::RwLock::new(value)) }

    pub fn read(&self) -> Result<ReadGuard<'_, T>, SyncError> {
        self.0.read().map_err(|_| SyncError::Poisoned("rwlock"))
    }

    pub fn write(&self) -> Result<WriteGuard<'_, T>, SyncError> {
        self.0.write().map_err(|_| SyncError::Poisoned("rwlock"))
    }

    pub fn into_inner(self) -> Result<T, SyncError> {
        self.0.into_inner().map_err(|_| SyncError::Poisoned("rwlock"))
    }
}

/// OS thread running a start routine which returns `T`.
///
/// Dropping a [`Thread`] without joining it detaches the thread.
#[derive(Debug)]
pub struct Thread<T> {
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> Thread<T> {
    /// Starts concurrent execution of `f` on a new thread.
    ///
    /// # Error
    ///
    /// Errors with a system/OS error if it was impossible to spawn a thread.
    pub fn spawn<F>(f: F) -> Result<Self, SyncError>
    where F: FnOnce() -> T + Send + 'static {
        Thread::with(thread::Builder::new(), f)
    }

    /// Similar to the [`Thread::spawn`], but allows to specify the name for the thread.
    ///
    /// # Error
    ///
    /// Errors with [`SyncError::InvalidName`] if the name contains a NUL byte.
    pub fn named<F>(name: impl Into<String>, f: F) -> Result<Self, SyncError>
    where F: FnOnce() -> T + Send + 'static {
        let name = name.into();
        check_name(&name)?;
        Thread::with(thread::Builder::new().name(name), f)
    }

    /// Similar to the [`Thread::spawn`], but allows to fully customize how the thread is
    /// constructed.
    pub fn with<F>(builder: thread::Builder, f: F) -> Result<Self, SyncError>
    where F: FnOnce() -> T + Send + 'static {
        let handle = builder.spawn(f)?;
        Ok(Thread { handle })
    }
}

impl<T> Thread<T> {
    pub fn name(&self) -> Option<&str> { self.handle.thread().name() }

    pub fn is_finished(&self) -> bool { self.handle.is_finished() }

    /// Blocks until the thread terminates and returns the value of its start routine.
    pub fn join(self) -> Result<T, SyncError> {
        let name = self.name().unwrap_or("<unnamed>").to_owned();
        self.handle
            .join()
            .map_err(|payload| SyncError::Panicked(name, panic_message(payload.as_ref()).to_owned()))
    }

    /// Releases the obligation to join the thread, which keeps running on its own.
    pub fn detach(self) { drop(self.handle) }
}

/// Thread names are passed to the OS as C strings and can't contain NUL bytes.
pub(crate) fn check_name(name: &str) -> Result<(), SyncError> {
    if name.contains('\0') {
        return Err(SyncError::InvalidName(name.to_owned()));
    }
    Ok(())
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
