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

//! Asynchronous I/O operations handed over from a reactor to the pool workers.
//!
//! A reactor creates an [`Event`] once it detects readiness of an I/O source, populates its
//! [`EventCtx`] with a kind, an argument, a buffer and a callback, and either fires the event
//! itself or submits it to a [`crate::ThreadPool`]. The event is moved along this chain, so there
//! is always a single owner, and it is released exactly once: when its last owner drops it.

use std::fmt::{self, Debug, Display, Formatter};
use std::ops;

use crate::buffer::BufSpan;

/// Kind of an I/O event: a combination of a source (TCP, UDP, file) and a direction (read,
/// write) flags.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Default)]
pub struct EventKind(u8);

impl EventKind {
    pub const NONE: EventKind = EventKind(0);
    pub const TCP: EventKind = EventKind(1);
    pub const UDP: EventKind = EventKind(2);
    pub const FILE: EventKind = EventKind(4);
    pub const READ: EventKind = EventKind(8);
    pub const WRITE: EventKind = EventKind(16);

    const ALL: u8 = 0b1_1111;

    pub fn bits(self) -> u8 { self.0 }

    /// Returns `None` if `bits` contain flags not known to [`EventKind`].
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL == 0 {
            Some(EventKind(bits))
        } else {
            None
        }
    }

    /// Checks whether all flags of `other` are set.
    pub fn contains(self, other: EventKind) -> bool { self.0 & other.0 == other.0 }

    /// Checks whether any of the flags of `other` is set.
    pub fn intersects(self, other: EventKind) -> bool { self.0 & other.0 != 0 }

    pub fn is_none(self) -> bool { self.0 == 0 }

    fn name(self) -> &'static str {
        match self {
            EventKind::TCP => "tcp",
            EventKind::UDP => "udp",
            EventKind::FILE => "file",
            EventKind::READ => "read",
            EventKind::WRITE => "write",
            _ => unreachable!("not a single flag"),
        }
    }
}

impl ops::BitOr for EventKind {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output { EventKind(self.0 | rhs.0) }
}

impl ops::BitOrAssign for EventKind {
    fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0 }
}

impl ops::BitAnd for EventKind {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output { EventKind(self.0 & rhs.0) }
}

/// Yields each set flag, from the lowest bit up.
impl Iterator for EventKind {
    type Item = EventKind;

    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            return None;
        }
        let flag = self.0 & self.0.wrapping_neg();
        self.0 &= !flag;
        Some(EventKind(flag))
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("none");
        }
        let kind = *self;
        for (no, flag) in kind.enumerate() {
            if no > 0 {
                f.write_str("|")?;
            }
            f.write_str(flag.name())?;
        }
        Ok(())
    }
}

#[cfg(feature = "popol")]
impl From<EventKind> for popol::Interest {
    fn from(kind: EventKind) -> Self {
        let mut interest = popol::interest::NONE;
        if kind.contains(EventKind::READ) {
            interest |= popol::interest::READ;
        }
        if kind.contains(EventKind::WRITE) {
            interest |= popol::interest::WRITE;
        }
        interest
    }
}

/// Callback invoked when an event is fired. It receives the ownership of the event.
pub type Callback<A, H> = Box<dyn FnOnce(Event<A, H>) + Send + 'static>;

/// Description of a single asynchronous I/O operation.
pub struct EventCtx<A, H = ()> {
    // Field order is the release order: the buffer goes first.
    buf: BufSpan,
    kind: EventKind,
    arg: A,
    callback: Option<Callback<A, H>>,
}

impl<A, H> EventCtx<A, H> {
    pub fn new(kind: EventKind, arg: A, buf: BufSpan) -> Self {
        EventCtx {
            buf,
            kind,
            arg,
            callback: None,
        }
    }

    /// Sets the callback invoked by [`Event::fire`].
    pub fn on_fire<F>(mut self, callback: F) -> Self
    where F: FnOnce(Event<A, H>) + Send + 'static {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn kind(&self) -> EventKind { self.kind }

    pub fn arg(&self) -> &A { &self.arg }

    pub fn arg_mut(&mut self) -> &mut A { &mut self.arg }

    pub fn buf(&self) -> &BufSpan { &self.buf }

    pub fn buf_mut(&mut self) -> &mut BufSpan { &mut self.buf }

    pub fn has_callback(&self) -> bool { self.callback.is_some() }

    /// Disassembles the context, dropping its callback.
    pub fn into_parts(self) -> (EventKind, A, BufSpan) { (self.kind, self.arg, self.buf) }
}

impl<A: Debug, H> Debug for EventCtx<A, H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCtx")
            .field("kind", &self.kind)
            .field("arg", &self.arg)
            .field("buf", &self.buf)
            .field("callback", &self.has_callback())
            .finish()
    }
}

/// An I/O event: operation context paired with the reactor backend handle `H`.
///
/// The backend handle is opaque to this crate; it is produced and consumed only by a reactor.
pub struct Event<A, H = ()> {
    // The context, with its buffer, is released before the backend handle.
    ctx: EventCtx<A, H>,
    handle: H,
}

impl<A> Event<A> {
    /// Creates an event which carries no backend handle.
    pub fn new(ctx: EventCtx<A>) -> Self { Event::with_handle(ctx, ()) }
}

impl<A, H> Event<A, H> {
    pub fn with_handle(ctx: EventCtx<A, H>, handle: H) -> Self { Event { ctx, handle } }

    pub fn kind(&self) -> EventKind { self.ctx.kind }

    pub fn ctx(&self) -> &EventCtx<A, H> { &self.ctx }

    pub fn ctx_mut(&mut self) -> &mut EventCtx<A, H> { &mut self.ctx }

    pub fn handle(&self) -> &H { &self.handle }

    pub fn handle_mut(&mut self) -> &mut H { &mut self.handle }

    /// Invokes the event callback, passing it the event.
    ///
    /// The callback becomes the owner of the event, which is released when the callback drops it.
    /// An event without a callback is released immediately.
    pub fn fire(mut self) {
        #[cfg(feature = "log")]
        log::trace!(target: "event", "Firing `{}` event", self.ctx.kind);

        match self.ctx.callback.take() {
            Some(callback) => callback(self),
            None => self.release(),
        }
    }

    /// Releases the event together with its context and buffer.
    pub fn release(self) {
        #[cfg(feature = "log")]
        log::trace!(target: "event", "Releasing `{}` event ({} bytes buffer)", self.ctx.kind, self.ctx.buf.size());
    }

    pub fn into_parts(self) -> (EventCtx<A, H>, H) { (self.ctx, self.handle) }
}

impl<A: Debug, H: Debug> Debug for Event<A, H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("ctx", &self.ctx).field("handle", &self.handle).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use crossbeam_channel as chan;

    use super::*;
    use crate::ThreadPool;

    #[test]
    fn kind_flags() {
        let mut kind = EventKind::TCP | EventKind::READ;
        assert_eq!(kind.bits(), 9);
        assert!(kind.contains(EventKind::TCP));
        assert!(kind.contains(EventKind::TCP | EventKind::READ));
        assert!(!kind.contains(EventKind::WRITE));
        assert!(kind.intersects(EventKind::READ | EventKind::WRITE));
        assert!(!kind.intersects(EventKind::UDP | EventKind::FILE));
        kind |= EventKind::WRITE;
        assert_eq!(kind & EventKind::WRITE, EventKind::WRITE);
        assert!(EventKind::NONE.is_none());
        assert!(kind.contains(EventKind::NONE));
    }

    #[test]
    fn kind_from_bits() {
        assert_eq!(EventKind::from_bits(8 | 2), Some(EventKind::UDP | EventKind::READ));
        assert_eq!(EventKind::from_bits(0), Some(EventKind::NONE));
        assert_eq!(EventKind::from_bits(32), None);
    }

    #[test]
    fn kind_iter_and_display() {
        let kind = EventKind::WRITE | EventKind::FILE;
        assert_eq!(kind.collect::<Vec<_>>(), vec![EventKind::FILE, EventKind::WRITE]);
        assert_eq!(kind.to_string(), "file|write");
        assert_eq!((EventKind::TCP | EventKind::READ).to_string(), "tcp|read");
        assert_eq!(EventKind::NONE.to_string(), "none");
    }

    #[cfg(feature = "popol")]
    #[test]
    fn kind_into_poll_interest() {
        let interest: popol::Interest = (EventKind::TCP | EventKind::READ).into();
        assert_eq!(interest, popol::interest::READ);
        let interest: popol::Interest = (EventKind::UDP | EventKind::READ | EventKind::WRITE).into();
        assert_eq!(interest, popol::interest::ALL);
        let interest: popol::Interest = EventKind::FILE.into();
        assert_eq!(interest, popol::interest::NONE);
    }

    /// Records its name into a shared log when dropped.
    struct Tracked(&'static str, Arc<Mutex<Vec<&'static str>>>);

    impl Drop for Tracked {
        fn drop(&mut self) { self.1.lock().unwrap().push(self.0) }
    }

    #[test]
    fn callback_owns_event() {
        let (send, recv) = chan::unbounded();
        let ctx = EventCtx::new(EventKind::UDP | EventKind::WRITE, 7u16, BufSpan::new(4)).on_fire(
            move |mut event: Event<u16>| {
                assert!(!event.ctx().has_callback());
                event.ctx_mut().buf_mut().write_all(b"ping").unwrap();
                *event.ctx_mut().arg_mut() += 1;
                send.send(event.into_parts()).unwrap();
            },
        );
        let event = Event::new(ctx);
        assert!(event.ctx().has_callback());
        event.fire();

        let (ctx, ()) = recv.try_recv().unwrap();
        let (kind, arg, buf) = ctx.into_parts();
        assert_eq!(kind, EventKind::UDP | EventKind::WRITE);
        assert_eq!(arg, 8);
        assert_eq!(buf.filled(), b"ping");
        assert!(recv.try_recv().is_err(), "callback must run once");
    }

    #[test]
    fn release_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ctx = EventCtx::new(EventKind::FILE, Tracked("arg", log.clone()), BufSpan::default());
        let event = Event::with_handle(ctx, Tracked("handle", log.clone()));
        event.fire();
        assert_eq!(*log.lock().unwrap(), vec!["arg", "handle"]);
    }

    #[test]
    fn release_without_firing_drops_context_before_handle() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let captured = Tracked("callback", log.clone());
        let kind = EventKind::TCP | EventKind::WRITE;
        let ctx = EventCtx::new(kind, Tracked("arg", log.clone()), BufSpan::new(8))
            .on_fire(move |_: Event<Tracked, Tracked>| drop(captured));
        let event = Event::with_handle(ctx, Tracked("handle", log.clone()));
        event.release();
        assert_eq!(*log.lock().unwrap(), vec!["arg", "callback", "handle"]);
    }

    #[test]
    fn released_by_callback_once() {
        let arg = Arc::new(());
        let ctx = EventCtx::new(EventKind::TCP | EventKind::READ, arg.clone(), BufSpan::new(8))
            .on_fire(|event: Event<Arc<()>>| event.release());
        let event = Event::new(ctx);
        assert_eq!(Arc::strong_count(&arg), 2);
        event.fire();
        assert_eq!(Arc::strong_count(&arg), 1);
    }

    #[test]
    fn events_cross_threads_with_backend_handle() {
        #[derive(Debug, PartialEq, Eq)]
        struct Fd(i32);

        let pool = ThreadPool::new(2).unwrap();
        let submitter = pool.submitter();
        let (send, recv) = chan::unbounded();
        for fd in 3..7 {
            let send = send.clone();
            let ctx = EventCtx::new(EventKind::TCP | EventKind::READ, (), BufSpan::new(32)).on_fire(
                move |event: Event<(), Fd>| {
                    let (_, handle) = event.into_parts();
                    send.send(handle).unwrap();
                },
            );
            submitter.submit_event(Event::with_handle(ctx, Fd(fd))).unwrap();
        }
        pool.shutdown().unwrap();
        drop(send);
        let mut fds = recv.iter().map(|fd| fd.0).collect::<Vec<_>>();
        fds.sort_unstable();
        assert_eq!(fds, vec![3, 4, 5, 6]);
    }
}
