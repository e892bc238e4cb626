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

use std::collections::LinkedList;
use std::fmt::{self, Debug, Formatter};

/// FIFO queue of payloads, each stored in its own heap-allocated list node.
///
/// Both [`TaskQueue::push`] and [`TaskQueue::pop`] are O(1) and never move already queued
/// payloads. The queue does no locking: sharing it between threads requires an external lock,
/// which is what [`crate::ThreadPool`] provides.
pub struct TaskQueue<T> {
    nodes: LinkedList<T>,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self { Self::new() }
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self { Self { nodes: empty!() } }

    /// Appends a payload at the rear of the queue.
    pub fn push(&mut self, payload: T) { self.nodes.push_back(payload) }

    /// Takes the payload from the front of the queue, freeing its node.
    ///
    /// Returns `None` for an empty queue, which is left untouched.
    pub fn pop(&mut self) -> Option<T> { self.nodes.pop_front() }

    /// Number of queued payloads.
    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    /// Drops all queued payloads together with their nodes.
    pub fn clear(&mut self) { self.nodes.clear() }
}

impl<T> Extend<T> for TaskQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for payload in iter {
            self.push(payload);
        }
    }
}

impl<T> FromIterator<T> for TaskQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut queue = TaskQueue::new();
        queue.extend(iter);
        queue
    }
}

impl<T> Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut queue = (1..=5).collect::<TaskQueue<_>>();
        queue.push(6);
        let drained = std::iter::from_fn(|| queue.pop()).collect::<Vec<_>>();
        assert_eq!(drained, vec![1, 2, 3, 4, 5, 6]);
        assert!(queue.is_empty());
    }

    #[test]
    fn len_tracks_push_and_pop() {
        let mut queue = TaskQueue::new();
        for k in 0..10 {
            queue.push(k);
        }
        for _ in 0..4 {
            assert!(queue.pop().is_some());
        }
        assert_eq!(queue.len(), 6);
    }

    #[test]
    fn pop_empty() {
        let mut queue = TaskQueue::<u32>::new();
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.len(), 0);
        queue.push(1);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn clear_drops_payloads() {
        use std::rc::Rc;

        let payload = Rc::new(());
        let mut queue = TaskQueue::new();
        queue.extend([payload.clone(), payload.clone(), payload.clone()]);
        assert_eq!(Rc::strong_count(&payload), 4);
        queue.clear();
        assert_eq!(Rc::strong_count(&payload), 1);
        assert!(queue.is_empty());
    }
}
