// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Cold, conflated, one-to-many broadcast.
//!
//! A [`ColdBroadcast`] keeps one current value. Each subscriber reads from its own
//! conflated inbox seeded with that value, so slow subscribers skip intermediate
//! values and never hold back the publisher or each other.
//!
//! "Cold" means upstream work can follow demand: the broadcast counts subscriptions
//! that are actively consumed and calls its [`ActivationHooks`] on the first
//! activation and on the last deactivation.
//!
//! ```
//! use attune_broadcast::ColdBroadcast;
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() -> attune_core::Result<()> {
//! let broadcast = ColdBroadcast::new();
//! broadcast.publish(1)?;
//!
//! let mut subscription = broadcast.open_subscription();
//! assert!(broadcast.has_active_subscriptions());
//! assert_eq!(subscription.next().await, Some(1));
//!
//! broadcast.publish(2)?;
//! broadcast.publish(3)?;
//! assert_eq!(subscription.next().await, Some(3));
//!
//! subscription.cancel();
//! assert!(!broadcast.has_active_subscriptions());
//! # Ok(())
//! # }
//! ```

use crate::activation::{Activation, ActivationHooks, NoHooks};
use crate::broadcast::Broadcast;
use crate::config::BroadcastConfig;
use crate::id::BroadcastId;
use crate::subscription::Subscription;
use attune_core::{ActivityAware, ActivitySignal, AttuneError, AttuneTask, Conflated, Result};
use attune_stream::{GateExit, GateExt};
use futures::StreamExt;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Weak};

struct State<T> {
    value: Option<T>,
    inboxes: Vec<Arc<Conflated<T>>>,
    closed: bool,
}

struct Core<T> {
    id: BroadcastId,
    config: BroadcastConfig,
    activation: Arc<Activation>,
    state: Mutex<State<T>>,
}

impl<T> Core<T> {
    fn close(&self) -> bool {
        let inboxes = {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            state.closed = true;
            core::mem::take(&mut state.inboxes)
        };
        for inbox in inboxes {
            inbox.close();
        }
        true
    }
}

impl<T> Drop for Core<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Cheaply cloneable handle to a cold broadcast; clones share state.
pub struct ColdBroadcast<T> {
    core: Arc<Core<T>>,
}

impl<T> Clone for ColdBroadcast<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> ColdBroadcast<T> {
    pub(crate) fn downgrade(&self) -> WeakBroadcast<T> {
        WeakBroadcast {
            core: Arc::downgrade(&self.core),
        }
    }
}

/// Non-owning reference to a broadcast, for loops that must not keep it alive.
pub(crate) struct WeakBroadcast<T> {
    core: Weak<Core<T>>,
}

impl<T> WeakBroadcast<T> {
    pub(crate) fn upgrade(&self) -> Option<ColdBroadcast<T>> {
        self.core.upgrade().map(|core| ColdBroadcast { core })
    }
}

impl<T> Clone for WeakBroadcast<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T> ColdBroadcast<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A broadcast with no value and no activation hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BroadcastConfig::default())
    }

    #[must_use]
    pub fn with_config(config: BroadcastConfig) -> Self {
        Self::with_hooks(config, Arc::new(NoHooks))
    }

    /// A broadcast whose activity edges are reported to `hooks`.
    #[must_use]
    pub fn with_hooks(config: BroadcastConfig, hooks: Arc<dyn ActivationHooks>) -> Self {
        let id = BroadcastId::next();
        let label = config.label().map(|label| Cow::Owned(label.to_owned()));
        let activation = Arc::new(Activation::new(id, label, hooks));
        Self {
            core: Arc::new(Core {
                id,
                config,
                activation,
                state: Mutex::new(State {
                    value: None,
                    inboxes: Vec::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// A broadcast already holding `value`.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        let broadcast = Self::new();
        broadcast.core.state.lock().value = Some(value);
        broadcast
    }

    #[must_use]
    pub fn id(&self) -> BroadcastId {
        self.core.id
    }

    #[must_use]
    pub fn config(&self) -> &BroadcastConfig {
        &self.core.config
    }

    /// Stores `value` as the current value and offers it to every subscriber.
    ///
    /// Never waits: a subscriber that has not read its previous value only sees
    /// this one.
    ///
    /// # Errors
    ///
    /// [`AttuneError::ChannelClosed`] after [`close`](Self::close).
    pub fn publish(&self, value: T) -> Result<()> {
        let mut state = self.core.state.lock();
        if state.closed {
            attune_core::trace!(broadcast = %self.core.id, "publish rejected: broadcast closed");
            return Err(AttuneError::closed(format!("broadcast {}", self.core.id)));
        }
        // Inboxes of cancelled subscriptions refuse the value and are pruned.
        state.inboxes.retain(|inbox| inbox.offer(value.clone()));
        state.value = Some(value);
        Ok(())
    }

    /// Opens a subscription seeded with the current value.
    ///
    /// The subscription counts as active right away. On a closed broadcast it
    /// yields the last value, if any, then ends, and is never counted.
    pub fn open_subscription(&self) -> Subscription<T> {
        let (subscription, open) = self.open_uncounted();
        if open {
            subscription.handle().set_active(true);
        }
        subscription
    }

    /// Opens a subscription gated by `signal`.
    ///
    /// Values are delivered only while the signal is `Active`, latest first on
    /// reactivation, and the subscription counts toward activity only during those
    /// periods. When the signal terminates the subscription is cancelled. The gate
    /// loop runs on the configured spawner.
    ///
    /// On a closed broadcast no gate is started: the subscription yields the last
    /// value, if any, then ends, and is never counted.
    ///
    /// # Panics
    ///
    /// With the default [`TokioSpawner`](attune_core::TokioSpawner), when called
    /// outside a tokio runtime. Use [`BroadcastConfig::with_spawner`] to run
    /// elsewhere.
    pub fn open_subscription_with<A>(&self, signal: &A) -> Subscription<T>
    where
        A: ActivitySignal + ?Sized,
    {
        let (raw, open) = self.open_uncounted();
        if signal.current().is_terminated() {
            attune_core::debug!(
                broadcast = %self.core.id,
                "gated subscription opened on a terminated signal"
            );
            raw.cancel();
            return raw;
        }
        if !open {
            attune_core::debug!(
                broadcast = %self.core.id,
                "gated subscription opened on a closed broadcast"
            );
            return raw;
        }

        let handle = raw.handle().clone();
        let output = Arc::new(Conflated::new());
        let subscription = Subscription::gated(output.clone(), handle.clone());

        // Sets the raw subscription active right away when the signal already is.
        let mut gated = raw.gated(signal);
        let task = AttuneTask::spawn_on(self.core.config.spawner(), move |cancel| async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    next = gated.next() => match next {
                        Some(value) => {
                            if !output.offer(value) {
                                break;
                            }
                        }
                        None => {
                            if gated.exit() == Some(GateExit::SourceEnded) {
                                output.close();
                            }
                            break;
                        }
                    },
                }
            }
        });
        handle.attach_task(task);
        subscription
    }

    /// Like [`open_subscription_with`](Self::open_subscription_with), but refuses
    /// a signal that has already terminated.
    ///
    /// # Errors
    ///
    /// [`AttuneError::Terminated`] when `signal` reports `Terminated`.
    pub fn try_open_subscription_with<A>(&self, signal: &A) -> Result<Subscription<T>>
    where
        A: ActivitySignal + ?Sized,
    {
        if signal.current().is_terminated() {
            return Err(AttuneError::Terminated);
        }
        Ok(self.open_subscription_with(signal))
    }

    fn open_uncounted(&self) -> (Subscription<T>, bool) {
        let mut state = self.core.state.lock();
        let inbox = Arc::new(Conflated::with_value(state.value.clone()));
        let open = !state.closed;
        if open {
            state.inboxes.retain(|inbox| !inbox.is_closed());
            state.inboxes.push(inbox.clone());
        } else {
            inbox.close();
        }
        drop(state);
        (
            Subscription::direct(inbox, self.core.activation.clone()),
            open,
        )
    }

    /// The current value, if anything has been published.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.core.state.lock().value.clone()
    }

    /// The current value.
    ///
    /// # Errors
    ///
    /// [`AttuneError::NoValue`] before the first publish.
    pub fn try_value(&self) -> Result<T> {
        self.value().ok_or(AttuneError::NoValue)
    }

    /// Closes the broadcast. Open subscriptions end after their pending value;
    /// later publishes fail. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let closed = self.core.close();
        if closed {
            attune_core::debug!(broadcast = %self.core.id, "broadcast closed");
        }
        closed
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.core.state.lock().closed
    }

    #[must_use]
    pub fn has_active_subscriptions(&self) -> bool {
        self.active_subscription_count() > 0
    }

    /// Number of open subscriptions, whether counted as active or not.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.core.state.lock();
        state.inboxes.retain(|inbox| !inbox.is_closed());
        state.inboxes.len()
    }

    /// Number of subscriptions currently counted as active.
    #[must_use]
    pub fn active_subscription_count(&self) -> usize {
        self.core.activation.count()
    }
}

impl<T> Default for ColdBroadcast<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Broadcast<T> for ColdBroadcast<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn id(&self) -> BroadcastId {
        self.core.id
    }

    fn open_subscription(&self) -> Subscription<T> {
        ColdBroadcast::open_subscription(self)
    }

    fn publish(&self, value: T) -> Result<()> {
        ColdBroadcast::publish(self, value)
    }

    fn has_active_subscriptions(&self) -> bool {
        ColdBroadcast::has_active_subscriptions(self)
    }
}

impl<T> fmt::Debug for ColdBroadcast<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColdBroadcast")
            .field("id", &self.core.id)
            .field("label", &self.core.config.label())
            .field("active", &self.core.activation.count())
            .finish_non_exhaustive()
    }
}
