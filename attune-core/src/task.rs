// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Background loops with cooperative cancellation, spawned on an explicit executor.
//!
//! Every loop attune runs on behalf of a consumer (gates, gated subscriptions,
//! mediator forwarding) goes through a [`Spawner`] chosen by the caller. The
//! returned [`AttuneTask`] cancels its loop when cancelled or dropped.
//!
//! ```
//! use attune_core::AttuneTask;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let task = AttuneTask::spawn(|cancel| async move {
//!     cancel.cancelled().await;
//! });
//!
//! task.cancel();
//! task.finished().await;
//! assert!(task.is_finished());
//! # }
//! ```

use core::future::Future;
use core::sync::atomic::{AtomicBool, Ordering};
use event_listener::Event;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;

/// One-shot flag that async code can wait on.
#[derive(Debug)]
struct Latch {
    set: AtomicBool,
    event: Event,
}

impl Default for Latch {
    fn default() -> Self {
        Self {
            set: AtomicBool::new(false),
            event: Event::new(),
        }
    }
}

impl Latch {
    fn set(&self) {
        if !self.set.swap(true, Ordering::AcqRel) {
            self.event.notify(usize::MAX);
        }
    }

    fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    async fn wait(&self) {
        loop {
            if self.is_set() {
                return;
            }
            let listener = self.event.listen();
            // Re-check: `set` may have fired before the listener was registered.
            if self.is_set() {
                return;
            }
            listener.await;
        }
    }
}

/// Cloneable cancellation flag shared between a task handle and its loop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    latch: Arc<Latch>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn cancel(&self) {
        self.latch.set();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.latch.is_set()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        self.latch.wait().await;
    }
}

/// Executor on which attune launches consumer loops.
///
/// The core never assumes which thread runs a callback; it only relies on the
/// executor running each submitted future.
pub trait Spawner: Send + Sync + 'static {
    fn spawn(&self, future: BoxFuture<'static, ()>);
}

impl<S: Spawner + ?Sized> Spawner for Arc<S> {
    fn spawn(&self, future: BoxFuture<'static, ()>) {
        (**self).spawn(future);
    }
}

/// Spawns onto a tokio runtime: the ambient one by default, or a designated one.
#[cfg(feature = "runtime-tokio")]
#[derive(Debug, Clone, Default)]
pub struct TokioSpawner {
    handle: Option<tokio::runtime::Handle>,
}

#[cfg(feature = "runtime-tokio")]
impl TokioSpawner {
    /// Spawns onto whichever runtime is current when a loop is launched.
    #[must_use]
    pub fn current() -> Self {
        Self::default()
    }

    /// Spawns onto `handle`, regardless of the caller's context.
    #[must_use]
    pub fn with_handle(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }
}

#[cfg(feature = "runtime-tokio")]
impl Spawner for TokioSpawner {
    fn spawn(&self, future: BoxFuture<'static, ()>) {
        match &self.handle {
            Some(handle) => {
                handle.spawn(future);
            }
            None => {
                tokio::spawn(future);
            }
        }
    }
}

/// Handle to a spawned loop. Cancels the loop on drop.
#[derive(Debug)]
pub struct AttuneTask {
    cancel: CancellationToken,
    done: Arc<Latch>,
}

impl AttuneTask {
    /// Spawns on the ambient tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    #[cfg(feature = "runtime-tokio")]
    pub fn spawn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn_on(&TokioSpawner::current(), f)
    }

    /// Spawns on `spawner`. The closure receives the token the loop must watch.
    pub fn spawn_on<S, F, Fut>(spawner: &S, f: F) -> Self
    where
        S: Spawner + ?Sized,
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let done = Arc::new(Latch::default());
        let future = f(cancel.clone());
        let guard = DoneGuard(done.clone());

        spawner.spawn(
            async move {
                let _guard = guard;
                future.await;
            }
            .boxed(),
        );

        Self { cancel, done }
    }

    /// Signals the loop to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `true` once the spawned future has completed or been dropped by its executor.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.done.is_set()
    }

    /// Resolves once the spawned future has completed.
    pub async fn finished(&self) {
        self.done.wait().await;
    }
}

impl Drop for AttuneTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct DoneGuard(Arc<Latch>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.set();
    }
}
