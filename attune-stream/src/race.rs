// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Single consumption loop over two streams.
//!
//! [`Race`] waits on whichever input has something next and reports both items
//! and the end of each side. Everything downstream of it (latest-value merge,
//! gating) is plain sequential state, written by this one loop only.

use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use pin_project::pin_project;

/// What a [`Race`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceEvent<L, R> {
    Left(L),
    Right(R),
    /// The left input is exhausted. Reported once.
    LeftEnded,
    /// The right input is exhausted. Reported once.
    RightEnded,
}

/// Which input is polled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceOrder {
    /// Alternate between inputs so neither starves the other.
    Alternate,
    /// Always drain the right input first.
    RightFirst,
}

#[pin_project]
#[derive(Debug)]
#[must_use = "streams do nothing unless polled"]
pub struct Race<L, R> {
    #[pin]
    left: L,
    #[pin]
    right: R,
    left_done: bool,
    right_done: bool,
    order: RaceOrder,
    left_turn: bool,
}

impl<L, R> Race<L, R>
where
    L: Stream,
    R: Stream,
{
    pub fn new(left: L, right: R, order: RaceOrder) -> Self {
        Self {
            left,
            right,
            left_done: false,
            right_done: false,
            order,
            left_turn: true,
        }
    }

    pub fn left(&self) -> &L {
        &self.left
    }

    pub fn right(&self) -> &R {
        &self.right
    }

    #[must_use]
    pub fn is_left_done(&self) -> bool {
        self.left_done
    }

    #[must_use]
    pub fn is_right_done(&self) -> bool {
        self.right_done
    }
}

/// Races `left` against `right`, alternating priority.
pub fn race<L: Stream, R: Stream>(left: L, right: R) -> Race<L, R> {
    Race::new(left, right, RaceOrder::Alternate)
}

fn poll_side<S: Stream, T>(
    stream: Pin<&mut S>,
    done: &mut bool,
    cx: &mut Context<'_>,
    wrap: impl FnOnce(S::Item) -> T,
    ended: T,
) -> Option<T> {
    if *done {
        return None;
    }
    match stream.poll_next(cx) {
        Poll::Ready(Some(item)) => Some(wrap(item)),
        Poll::Ready(None) => {
            *done = true;
            Some(ended)
        }
        Poll::Pending => None,
    }
}

impl<L, R> Stream for Race<L, R>
where
    L: Stream,
    R: Stream,
{
    type Item = RaceEvent<L::Item, R::Item>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.left_done && *this.right_done {
            return Poll::Ready(None);
        }

        let left_first = match this.order {
            RaceOrder::Alternate => {
                let turn = *this.left_turn;
                *this.left_turn = !turn;
                turn
            }
            RaceOrder::RightFirst => false,
        };

        for poll_left in [left_first, !left_first] {
            let event = if poll_left {
                poll_side(
                    this.left.as_mut(),
                    this.left_done,
                    cx,
                    RaceEvent::Left,
                    RaceEvent::LeftEnded,
                )
            } else {
                poll_side(
                    this.right.as_mut(),
                    this.right_done,
                    cx,
                    RaceEvent::Right,
                    RaceEvent::RightEnded,
                )
            };
            if let Some(event) = event {
                return Poll::Ready(Some(event));
            }
        }

        Poll::Pending
    }
}
