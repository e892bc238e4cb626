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
use std::sync::Arc;

use crate::event::Event;
use crate::pool::{Error, Shared};
use crate::task::{Task, TaskHandle};

/// Submission API to a [`crate::ThreadPool`] which can be sent to other threads.
///
/// A submitter outlives neither the queue nor the workers: once the pool is shut down, all
/// submissions made via its submitters are rejected with [`Error::ShuttingDown`].
#[derive(Clone)]
pub struct Submitter {
    shared: Arc<Shared>,
}

impl Submitter {
    pub(crate) fn new(shared: Arc<Shared>) -> Self { Self { shared } }

    /// Schedules `f` for execution on one of the pool workers.
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

    /// Hands the event over to a pool worker, which fires it.
    pub fn submit_event<A, H>(&self, event: Event<A, H>) -> Result<(), Error>
    where
        A: Send + 'static,
        H: Send + 'static,
    {
        self.submit(move || event.fire())
    }

    pub fn is_shutting_down(&self) -> bool { self.shared.is_shutting_down() }
}

impl Debug for Submitter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitter").field("shutting_down", &self.is_shutting_down()).finish()
    }
}
