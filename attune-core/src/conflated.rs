// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Single-consumer conflated slot.
//!
//! A [`Conflated`] holds at most one pending value. Writers never block: a new
//! [`offer`](Conflated::offer) overwrites whatever the reader has not taken yet.
//! It is the per-subscriber inbox behind broadcasts and gated streams.

use core::task::{Context, Poll};
use futures::task::AtomicWaker;
use parking_lot::Mutex;

#[derive(Debug)]
struct SlotState<T> {
    value: Option<T>,
    closed: bool,
}

/// A conflating, single-reader mailbox.
#[derive(Debug)]
pub struct Conflated<T> {
    state: Mutex<SlotState<T>>,
    waker: AtomicWaker,
}

impl<T> Conflated<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_value(None)
    }

    /// Creates a slot already holding `value` when present.
    #[must_use]
    pub fn with_value(value: Option<T>) -> Self {
        Self {
            state: Mutex::new(SlotState {
                value,
                closed: false,
            }),
            waker: AtomicWaker::new(),
        }
    }

    /// Stores `value`, replacing any value the reader has not taken.
    ///
    /// Returns `false`, dropping the value, when the slot is closed.
    pub fn offer(&self, value: T) -> bool {
        {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            state.value = Some(value);
        }
        self.waker.wake();
        true
    }

    /// Closes the slot. A value already stored stays readable; after it is taken the
    /// reader sees the end of the stream.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.waker.wake();
    }

    /// Closes the slot and discards any pending value.
    pub fn cancel(&self) {
        {
            let mut state = self.state.lock();
            state.closed = true;
            state.value = None;
        }
        self.waker.wake();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Takes the pending value without waiting.
    pub fn take(&self) -> Option<T> {
        self.state.lock().value.take()
    }

    /// `Ready(Some)` with the pending value, `Ready(None)` once closed and drained,
    /// `Pending` otherwise.
    pub fn poll_take(&self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if let Some(ready) = self.try_ready() {
            return ready;
        }
        self.waker.register(cx.waker());
        // A writer may have raced the registration.
        self.try_ready().unwrap_or(Poll::Pending)
    }

    fn try_ready(&self) -> Option<Poll<Option<T>>> {
        let mut state = self.state.lock();
        match state.value.take() {
            Some(value) => Some(Poll::Ready(Some(value))),
            None if state.closed => Some(Poll::Ready(None)),
            None => None,
        }
    }
}

impl<T> Default for Conflated<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::task::noop_waker_ref;

    #[test]
    fn offer_overwrites_pending_value() {
        let slot = Conflated::new();
        slot.offer(1);
        slot.offer(2);

        assert_eq!(slot.take(), Some(2));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn close_drains_then_ends() {
        let slot = Conflated::with_value(Some("last"));
        slot.close();
        let mut cx = Context::from_waker(noop_waker_ref());

        assert_eq!(slot.poll_take(&mut cx), Poll::Ready(Some("last")));
        assert_eq!(slot.poll_take(&mut cx), Poll::Ready(None));
        assert!(!slot.offer("late"));
    }

    #[test]
    fn cancel_discards_pending_value() {
        let slot = Conflated::with_value(Some(7));
        slot.cancel();
        let mut cx = Context::from_waker(noop_waker_ref());

        assert_eq!(slot.poll_take(&mut cx), Poll::Ready(None));
    }
}
