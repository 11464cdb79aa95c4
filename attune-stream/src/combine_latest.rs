// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Latest-pair merge of two independent streams.
//!
//! ```
//! use attune_stream::CombineLatestExt;
//! use futures::channel::mpsc::unbounded;
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (numbers_tx, numbers) = unbounded::<i32>();
//! let (labels_tx, labels) = unbounded::<&str>();
//! let mut pairs = numbers.combine_latest(labels);
//!
//! numbers_tx.unbounded_send(1).unwrap();
//! labels_tx.unbounded_send("x").unwrap();
//! assert_eq!(pairs.next().await, Some((1, "x")));
//!
//! numbers_tx.unbounded_send(2).unwrap();
//! assert_eq!(pairs.next().await, Some((2, "x")));
//! # }
//! ```

use crate::race::{Race, RaceEvent, RaceOrder};
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::{ready, Stream};
use pin_project::pin_project;

/// Stream returned by [`combine_latest`].
///
/// Emits `(latest_left, latest_right)` on every update from either side once both
/// sides have produced a value. A side that ends keeps contributing its last value;
/// the merge ends when both sides have ended.
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct CombineLatest<A: Stream, B: Stream> {
    #[pin]
    inputs: Race<A, B>,
    latest_left: Option<A::Item>,
    latest_right: Option<B::Item>,
}

pub fn combine_latest<A, B>(left: A, right: B) -> CombineLatest<A, B>
where
    A: Stream,
    B: Stream,
    A::Item: Clone,
    B::Item: Clone,
{
    CombineLatest {
        inputs: Race::new(left, right, RaceOrder::Alternate),
        latest_left: None,
        latest_right: None,
    }
}

impl<A, B> Stream for CombineLatest<A, B>
where
    A: Stream,
    B: Stream,
    A::Item: Clone,
    B::Item: Clone,
{
    type Item = (A::Item, B::Item);

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            match ready!(this.inputs.as_mut().poll_next(cx)) {
                Some(RaceEvent::Left(value)) => *this.latest_left = Some(value),
                Some(RaceEvent::Right(value)) => *this.latest_right = Some(value),
                Some(RaceEvent::LeftEnded | RaceEvent::RightEnded) => continue,
                None => return Poll::Ready(None),
            }

            if let (Some(left), Some(right)) =
                (this.latest_left.as_ref(), this.latest_right.as_ref())
            {
                return Poll::Ready(Some((left.clone(), right.clone())));
            }
        }
    }
}

/// Extension trait providing [`combine_latest`] as a method.
pub trait CombineLatestExt: Stream + Sized {
    /// Pairs this stream's latest value with `other`'s latest value.
    fn combine_latest<B>(self, other: B) -> CombineLatest<Self, B>
    where
        B: Stream,
        Self::Item: Clone,
        B::Item: Clone;
}

impl<S: Stream> CombineLatestExt for S {
    fn combine_latest<B>(self, other: B) -> CombineLatest<Self, B>
    where
        B: Stream,
        Self::Item: Clone,
        B::Item: Clone,
    {
        combine_latest(self, other)
    }
}
