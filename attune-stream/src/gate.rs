// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Activity-gated delivery.
//!
//! A gate consumes a source together with an [`ActivitySignal`]:
//!
//! - while the signal is `Active`, values pass through as they arrive;
//! - while it is `Inactive`, only the most recent value is kept;
//! - on reactivation that single value is delivered, never a backlog;
//! - on `Terminated`, or when the signal's owner goes away, the gate stops.
//!
//! Sources that are [`ActivityAware`](attune_core::ActivityAware) are told about every
//! transition the gate observes, so producers upstream can start or stop work.
//!
//! ```
//! use attune_core::{untracked, ActivityState, Lifecycle};
//! use attune_stream::GateExt;
//! use futures::channel::mpsc::unbounded;
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let lifecycle = Lifecycle::new(ActivityState::Inactive);
//! let (tx, rx) = unbounded::<i32>();
//! let mut gated = untracked(rx).gated(&lifecycle.signal());
//!
//! lifecycle.activate();
//! tx.unbounded_send(1).unwrap();
//! assert_eq!(gated.next().await, Some(1));
//!
//! lifecycle.terminate();
//! tx.unbounded_send(2).unwrap();
//! assert_eq!(gated.next().await, None);
//! # }
//! ```

use crate::race::{Race, RaceEvent, RaceOrder};
use attune_core::{
    ActivityChanges, ActivitySignal, ActivityState, AttuneError, AttuneTask, GateSource, Result,
    Spawner,
};
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::{ready, Stream, StreamExt};
use pin_project::pin_project;

/// Why a gate stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateExit {
    /// The source ended and nothing was left to deliver.
    SourceEnded,
    /// The activity signal terminated, or its owner went away.
    Terminated,
}

/// Source stream gated by an activity signal. See the [module docs](self).
///
/// The gate owns whatever it is given. Pass `&mut source` to keep ownership of a
/// source the gate must not release.
#[pin_project]
#[must_use = "streams do nothing unless polled"]
pub struct GatedStream<S: GateSource> {
    #[pin]
    inputs: Race<S, ActivityChanges>,
    active: bool,
    pending: Option<S::Item>,
    exit: Option<GateExit>,
}

fn notify<S: GateSource>(source: &S, active: bool) {
    if let Some(aware) = source.activity_aware() {
        aware.set_active(active);
    }
}

impl<S: GateSource> GatedStream<S> {
    pub fn new<A: ActivitySignal + ?Sized>(source: S, signal: &A) -> Self {
        // Subscribe before sampling so no transition falls in between.
        let changes = signal.changes();
        let initial = signal.current();

        notify(&source, initial.is_active());

        let exit = if initial.is_terminated() {
            attune_core::debug!("gate opened on a terminated signal; source left untouched");
            Some(GateExit::Terminated)
        } else {
            None
        };

        Self {
            // Activity first, so a value is never let through after an unseen `Inactive`.
            inputs: Race::new(source, changes, RaceOrder::RightFirst),
            active: initial.is_active(),
            pending: None,
            exit,
        }
    }

    /// Whether the gate currently lets values through.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// `Some` once the gate has stopped.
    #[must_use]
    pub fn exit(&self) -> Option<GateExit> {
        self.exit
    }

    pub fn source(&self) -> &S {
        self.inputs.left()
    }

    /// Drives the gate, calling `deliver` for every value let through.
    ///
    /// A failing `deliver` stops this gate only; the error is returned as
    /// [`AttuneError::Delivery`].
    pub async fn run<F, Fut, E>(mut self, mut deliver: F) -> Result<GateExit>
    where
        F: FnMut(S::Item) -> Fut,
        Fut: Future<Output = core::result::Result<(), E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        while let Some(value) = self.next().await {
            if let Err(error) = deliver(value).await {
                attune_core::warn!(error = %error, "deliver callback failed; stopping gate");
                return Err(AttuneError::delivery(error));
            }
        }
        Ok(self.exit.unwrap_or(GateExit::SourceEnded))
    }
}

impl<S: GateSource> Stream for GatedStream<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if this.exit.is_some() {
                return Poll::Ready(None);
            }

            match ready!(this.inputs.as_mut().poll_next(cx)) {
                Some(RaceEvent::Left(value)) => {
                    if *this.active {
                        return Poll::Ready(Some(value));
                    }
                    *this.pending = Some(value);
                }
                Some(RaceEvent::LeftEnded) => {
                    // A value held back while inactive still waits for reactivation.
                    if this.pending.is_none() {
                        *this.exit = Some(GateExit::SourceEnded);
                    }
                }
                Some(RaceEvent::Right(ActivityState::Active)) => {
                    let inputs = this.inputs.as_ref().get_ref();
                    if !*this.active {
                        *this.active = true;
                        notify(inputs.left(), true);
                    }
                    if let Some(value) = this.pending.take() {
                        if inputs.is_left_done() {
                            *this.exit = Some(GateExit::SourceEnded);
                        }
                        return Poll::Ready(Some(value));
                    }
                }
                Some(RaceEvent::Right(ActivityState::Inactive)) => {
                    if *this.active {
                        *this.active = false;
                        notify(this.inputs.as_ref().get_ref().left(), false);
                    }
                }
                Some(RaceEvent::Right(ActivityState::Terminated) | RaceEvent::RightEnded) => {
                    if *this.active {
                        *this.active = false;
                        notify(this.inputs.as_ref().get_ref().left(), false);
                    }
                    *this.pending = None;
                    *this.exit = Some(GateExit::Terminated);
                }
                None => *this.exit = Some(GateExit::SourceEnded),
            }
        }
    }
}

/// Extension trait gating any [`GateSource`] with an activity signal.
pub trait GateExt: GateSource + Sized {
    /// Gates this source. The returned stream yields what the gate lets through.
    fn gated<A: ActivitySignal + ?Sized>(self, signal: &A) -> GatedStream<Self> {
        GatedStream::new(self, signal)
    }

    /// Runs the gate in the background on `spawner`, calling `deliver` there.
    ///
    /// Dropping or cancelling the returned task stops the loop.
    fn spawn_gated<Sp, A, F, Fut, E>(
        self,
        spawner: &Sp,
        signal: &A,
        deliver: F,
    ) -> AttuneTask
    where
        Self: Send + 'static,
        Self::Item: Send + 'static,
        Sp: Spawner + ?Sized,
        A: ActivitySignal + ?Sized,
        F: FnMut(Self::Item) -> Fut + Send + 'static,
        Fut: Future<Output = core::result::Result<(), E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        let gated = self.gated(signal);
        AttuneTask::spawn_on(spawner, move |cancel| async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    attune_core::trace!("gated loop cancelled");
                }
                result = gated.run(deliver) => {
                    if let Ok(exit) = result {
                        attune_core::debug!(?exit, "gated loop finished");
                    }
                }
            }
        })
    }
}

impl<S: GateSource> GateExt for S {}
