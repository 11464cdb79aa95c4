// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Optional capability through which a consumer tells its source whether it is
//! currently being consumed.
//!
//! Gates and mediators query a source with [`GateSource::activity_aware`]. Sources
//! that can start or stop upstream work on demand answer with a handle; plain
//! streams answer `None` and are simply consumed.

use core::pin::Pin;
use futures::channel::mpsc;
use futures::Stream;

/// Something that wants to know whether its consumer is active.
pub trait ActivityAware: Send + Sync {
    fn set_active(&self, active: bool);
}

/// A stream that can be handed to a gate or a mediator.
pub trait GateSource: Stream + Unpin {
    /// Capability query. The default answers that the source does not track activity.
    fn activity_aware(&self) -> Option<&dyn ActivityAware> {
        None
    }
}

/// Adapter that lets any `Unpin` stream act as a [`GateSource`] without activity tracking.
#[derive(Debug)]
pub struct Untracked<S>(pub S);

impl<S: Stream + Unpin> Stream for Untracked<S> {
    type Item = S::Item;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut core::task::Context<'_>,
    ) -> core::task::Poll<Option<Self::Item>> {
        Pin::new(&mut self.0).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<S: Stream + Unpin> GateSource for Untracked<S> {}

/// Wraps a plain stream so it can be gated.
pub fn untracked<S: Stream + Unpin>(stream: S) -> Untracked<S> {
    Untracked(stream)
}

impl<S: GateSource + ?Sized> GateSource for &mut S {
    fn activity_aware(&self) -> Option<&dyn ActivityAware> {
        (**self).activity_aware()
    }
}

impl<T> GateSource for mpsc::UnboundedReceiver<T> {}

impl<T> GateSource for mpsc::Receiver<T> {}

impl<T> GateSource for Pin<Box<dyn Stream<Item = T> + Send + 'static>> {}

impl<T> GateSource for Pin<Box<dyn Stream<Item = T> + Send + Sync + 'static>> {}
