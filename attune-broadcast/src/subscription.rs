// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Subscriptions to a broadcast.
//!
//! A [`Subscription`] reads its own conflated inbox: if the consumer falls behind,
//! intermediate values are skipped and only the latest one is kept. Its
//! [`SubscriptionHandle`] is what the broadcast counts; it can be cloned to cancel
//! the subscription from elsewhere.

use crate::activation::Activation;
use crate::id::BroadcastId;
use attune_core::{ActivityAware, AttuneError, AttuneTask, Conflated, GateSource, Result};
use core::fmt;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;

/// Type-erased inbox a handle closes when it shuts down.
pub(crate) trait Inbox: Send + Sync {
    fn close(&self);
    fn cancel(&self);
}

impl<T: Send> Inbox for Conflated<T> {
    fn close(&self) {
        Conflated::close(self);
    }

    fn cancel(&self) {
        Conflated::cancel(self);
    }
}

struct Shared {
    counted: AtomicBool,
    cancelled: AtomicBool,
    activation: Arc<Activation>,
    inboxes: Mutex<Vec<Arc<dyn Inbox>>>,
    task: Mutex<Option<AttuneTask>>,
}

/// Cloneable control handle of one subscription.
///
/// Telling the handle whether its subscription is being consumed moves the
/// broadcast's activation counter; see [`ActivityAware`].
#[derive(Clone)]
pub struct SubscriptionHandle {
    shared: Arc<Shared>,
}

impl SubscriptionHandle {
    pub(crate) fn new(activation: Arc<Activation>, inbox: Arc<dyn Inbox>) -> Self {
        Self {
            shared: Arc::new(Shared {
                counted: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                activation,
                inboxes: Mutex::new(vec![inbox]),
                task: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn attach_inbox(&self, inbox: Arc<dyn Inbox>) {
        let mut inboxes = self.shared.inboxes.lock();
        if self.is_cancelled() {
            inbox.cancel();
        } else {
            inboxes.push(inbox);
        }
    }

    pub(crate) fn attach_task(&self, task: AttuneTask) {
        let mut slot = self.shared.task.lock();
        if self.is_cancelled() {
            task.cancel();
        } else {
            *slot = Some(task);
        }
    }

    /// Stops the subscription: uncounts it, drops anything pending and ends its
    /// stream. Idempotent and safe to call while a value is being delivered.
    pub fn cancel(&self) {
        self.shutdown(false);
    }

    /// Like `cancel`, but lets a value already in the inbox be read first.
    pub(crate) fn release(&self) {
        self.shutdown(true);
    }

    fn shutdown(&self, graceful: bool) {
        if self.shared.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.activation.deactivate(&self.shared.counted);

        // Taken out first so no lock is held while inboxes wake their readers.
        let inboxes = core::mem::take(&mut *self.shared.inboxes.lock());
        for inbox in inboxes {
            if graceful {
                inbox.close();
            } else {
                inbox.cancel();
            }
        }
        let task = self.shared.task.lock().take();
        drop(task);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Whether the subscription currently counts toward its broadcast's activity.
    #[must_use]
    pub fn is_counted(&self) -> bool {
        self.shared.counted.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn broadcast_id(&self) -> BroadcastId {
        self.shared.activation.id()
    }
}

impl ActivityAware for SubscriptionHandle {
    fn set_active(&self, active: bool) {
        let shared = &self.shared;
        if active {
            shared.activation.activate(&shared.counted, &shared.cancelled);
        } else {
            shared.activation.deactivate(&shared.counted);
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("broadcast", &self.broadcast_id())
            .field("counted", &self.is_counted())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Stream of the values published to a broadcast, latest first.
///
/// Dropping a subscription cancels it.
#[must_use = "a subscription counts toward activity until dropped"]
pub struct Subscription<T> {
    inbox: Arc<Conflated<T>>,
    handle: SubscriptionHandle,
    tracks_activity: bool,
    ended: bool,
}

impl<T: Send + 'static> Subscription<T> {
    /// A subscription reading the broadcast's inbox directly.
    pub(crate) fn direct(inbox: Arc<Conflated<T>>, activation: Arc<Activation>) -> Self {
        let handle = SubscriptionHandle::new(activation, inbox.clone());
        Self {
            inbox,
            handle,
            tracks_activity: true,
            ended: false,
        }
    }

    /// A subscription fed by a gate loop that owns the activity reporting.
    pub(crate) fn gated(inbox: Arc<Conflated<T>>, handle: SubscriptionHandle) -> Self {
        handle.attach_inbox(inbox.clone());
        Self {
            inbox,
            handle,
            tracks_activity: false,
            ended: false,
        }
    }
}

impl<T> Subscription<T> {
    /// Waits for the next value.
    ///
    /// # Errors
    ///
    /// [`AttuneError::ChannelClosed`] once the subscription has ended, either
    /// because it was cancelled or because its broadcast was closed or dropped.
    pub async fn recv(&mut self) -> Result<T> {
        self.next()
            .await
            .ok_or_else(|| AttuneError::closed("subscription ended"))
    }

    /// Takes the pending value, if any, without waiting.
    ///
    /// # Errors
    ///
    /// [`AttuneError::ChannelClosed`] once the subscription has ended and nothing
    /// is left to read.
    pub fn try_recv(&mut self) -> Result<Option<T>> {
        match self.inbox.take() {
            Some(value) => Ok(Some(value)),
            None if self.inbox.is_closed() => {
                self.ended = true;
                Err(AttuneError::closed("subscription ended"))
            }
            None => Ok(None),
        }
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    #[must_use]
    pub fn handle(&self) -> &SubscriptionHandle {
        &self.handle
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let polled = self.inbox.poll_take(cx);
        if let Poll::Ready(None) = polled {
            self.ended = true;
        }
        polled
    }
}

impl<T> GateSource for Subscription<T> {
    fn activity_aware(&self) -> Option<&dyn ActivityAware> {
        self.tracks_activity
            .then_some(&self.handle as &dyn ActivityAware)
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if self.ended {
            self.handle.release();
        } else {
            self.handle.cancel();
        }
    }
}
