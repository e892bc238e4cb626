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

#![deny(
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case,
    unused_mut,
    unused_imports,
    dead_code,
    //missing_docs
)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Concurrent execution engine for an asynchronous I/O runtime.
//!
//! A [`ThreadPool`] runs a fixed number of worker threads serving a single FIFO [`TaskQueue`]
//! protected by one [`sync::Lock`] and one [`sync::CondVar`]. Tasks are closures submitted
//! either directly to the pool or via a cloneable [`Submitter`].
//!
//! I/O work is represented by [`Event`]s: a reactor (not part of this crate) detecting readiness
//! of an I/O source creates an event with an [`EventCtx`] describing the operation and owning its
//! [`BufSpan`], and submits it to the pool. A worker fires the event, moving it into the event
//! callback, which becomes its last owner. Since events are never shared or copied, each of them
//! is released exactly once.
//!
//! Pool shutdown drains all the tasks which were accepted before the shutdown was requested and
//! rejects all submissions made after that with [`pool::Error::ShuttingDown`].

#[macro_use]
extern crate amplify;

mod buffer;
pub mod event;
pub mod pool;
mod queue;
mod submitter;
pub mod sync;
mod task;

pub use buffer::{BufSpan, BufferError, DEFAULT_BUFFER_SIZE};
pub use event::{Callback, Event, EventCtx, EventKind};
pub use pool::{PoolConfig, ShutdownReport, ThreadPool, WorkerReport, DEFAULT_THREADS};
pub use queue::TaskQueue;
pub use submitter::Submitter;
pub use task::{Task, TaskHandle};
