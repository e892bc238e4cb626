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

use std::fmt::{self, Debug, Formatter};

use crossbeam_channel as chan;

use crate::pool::Error;

/// Unit of work executed by a pool worker.
pub struct Task(Box<dyn FnOnce() + Send + 'static>);

impl Task {
    pub fn new<F>(f: F) -> Self
    where F: FnOnce() + Send + 'static {
        Task(Box::new(f))
    }

    /// Runs the task body, consuming the task.
    pub fn run(self) { (self.0)() }
}

impl Debug for Task {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str("Task(..)") }
}

/// Handle to the value produced by a task submitted with [`crate::ThreadPool::spawn`].
#[derive(Debug)]
pub struct TaskHandle<T> {
    recv: chan::Receiver<T>,
}

impl<T: Send + 'static> TaskHandle<T> {
    /// Wraps `f` into a [`Task`] which delivers its return value to the created handle.
    pub(crate) fn wrap<F>(f: F) -> (Task, Self)
    where F: FnOnce() -> T + Send + 'static {
        let (send, recv) = chan::bounded(1);
        let task = Task::new(move || {
            // The handle may have been dropped: nobody waits for the value then.
            let _ = send.send(f());
        });
        (task, TaskHandle { recv })
    }
}

impl<T> TaskHandle<T> {
    /// Blocks until the task completes and returns its value.
    ///
    /// # Error
    ///
    /// Errors with [`Error::TaskLost`] if the task has panicked or was dropped without running.
    pub fn join(self) -> Result<T, Error> { self.recv.recv().map_err(|_| Error::TaskLost) }

    /// Returns the value if the task has already completed, or `Ok(None)` if it has not.
    pub fn try_join(&self) -> Result<Option<T>, Error> {
        match self.recv.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(chan::TryRecvError::Empty) => Ok(None),
            Err(chan::TryRecvError::Disconnected) => Err(Error::TaskLost),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_task_delivers_value() {
        let (task, handle) = TaskHandle::wrap(|| 6 * 7);
        assert!(matches!(handle.try_join(), Ok(None)));
        task.run();
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn dropped_task_is_lost() {
        let (task, handle) = TaskHandle::wrap(|| "never");
        drop(task);
        assert!(matches!(handle.try_join(), Err(Error::TaskLost)));
        assert!(matches!(handle.join(), Err(Error::TaskLost)));
    }
}
