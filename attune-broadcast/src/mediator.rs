// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! A broadcast fed by other broadcasts.
//!
//! A [`Mediator`] is a [`ColdBroadcast`] that owns a set of upstream sources. Each
//! source is plugged, meaning a forwarding loop relays its values into the
//! mediator, only while the mediator itself has an active subscriber. Upstream
//! broadcasts therefore see demand exactly when the mediator does.
//!
//! ```
//! use attune_broadcast::{ColdBroadcast, Mediator};
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() -> attune_core::Result<()> {
//! let temperature = ColdBroadcast::<i32>::new();
//! let readings = Mediator::<String>::new();
//! readings.add_source_with(&temperature, |celsius: i32, out| {
//!     out.publish(format!("{celsius}°C"))
//! });
//!
//! assert!(!temperature.has_active_subscriptions());
//!
//! let mut subscription = readings.open_subscription();
//! assert!(temperature.has_active_subscriptions());
//!
//! temperature.publish(21)?;
//! assert_eq!(subscription.next().await.as_deref(), Some("21°C"));
//!
//! drop(subscription);
//! assert!(!readings.has_active_subscriptions());
//! # Ok(())
//! # }
//! ```
//!
//! With the default [`IdlePolicy::HoldUpstream`] an idle mediator keeps its
//! upstream subscriptions open but marked inactive, and resumes them on the next
//! activation without resubscribing.

use crate::activation::ActivationHooks;
use crate::broadcast::Broadcast;
use crate::cold_broadcast::{ColdBroadcast, WeakBroadcast};
use crate::config::{IdlePolicy, MediatorConfig};
use crate::id::BroadcastId;
use crate::subscription::{Subscription, SubscriptionHandle};
use attune_core::{ActivityAware, ActivitySignal, AttuneTask, Result, Spawner};
use futures::lock::Mutex as AsyncMutex;
use futures::StreamExt;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

type Transform<E, T> = Arc<dyn Fn(E, &ColdBroadcast<T>) -> Result<()> + Send + Sync>;

/// One registered upstream, type-erased over its element type.
trait Binding<T>: Send {
    fn upstream(&self) -> BroadcastId;
    fn is_plugged(&self) -> bool;
    /// Starts forwarding unless a forwarding loop is already running.
    fn plug(&mut self, mediator: &WeakBroadcast<T>, spawner: &Arc<dyn Spawner>);
    /// Stops forwarding. `release` also gives up the upstream subscription.
    fn unplug(&mut self, release: bool);
}

struct SourceBinding<E, T, B> {
    upstream: B,
    transform: Transform<E, T>,
    subscription: Option<(Arc<AsyncMutex<Subscription<E>>>, SubscriptionHandle)>,
    job: Option<AttuneTask>,
}

impl<E, T, B> Binding<T> for SourceBinding<E, T, B>
where
    E: Send + 'static,
    T: Clone + Send + Sync + 'static,
    B: Broadcast<E> + 'static,
{
    fn upstream(&self) -> BroadcastId {
        self.upstream.id()
    }

    fn is_plugged(&self) -> bool {
        self.job.as_ref().is_some_and(|job| !job.is_finished())
    }

    fn plug(&mut self, mediator: &WeakBroadcast<T>, spawner: &Arc<dyn Spawner>) {
        if self.is_plugged() {
            return;
        }

        let upstream = &self.upstream;
        let (subscription, handle) = self.subscription.get_or_insert_with(|| {
            let subscription = upstream.open_subscription();
            let handle = subscription.handle().clone();
            (Arc::new(AsyncMutex::new(subscription)), handle)
        });
        handle.set_active(true);

        let subscription = subscription.clone();
        let transform = self.transform.clone();
        let mediator = mediator.clone();
        let upstream_id = upstream.id();

        self.job = Some(AttuneTask::spawn_on(spawner, move |cancel| async move {
            // The previous loop may still hold the subscription until it sees its cancellation.
            let mut subscription = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                guard = subscription.lock() => guard,
            };

            loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return,
                    next = subscription.next() => next,
                };
                let Some(value) = next else {
                    attune_core::debug!(
                        upstream = %upstream_id,
                        "upstream ended; forwarding stopped"
                    );
                    break;
                };
                let Some(target) = mediator.upgrade() else {
                    return;
                };
                if let Err(error) = transform(value, &target) {
                    attune_core::warn!(
                        mediator = %target.id(),
                        upstream = %upstream_id,
                        error = %error,
                        "source transform failed; forwarding stopped"
                    );
                    break;
                }
            }

            // Nobody consumes this upstream until the next plug marks it active again.
            subscription.handle().set_active(false);
        }));
    }

    fn unplug(&mut self, release: bool) {
        if let Some(job) = self.job.take() {
            job.cancel();
        }
        if release {
            if let Some((_, handle)) = self.subscription.take() {
                handle.cancel();
            }
        } else if let Some((_, handle)) = &self.subscription {
            handle.set_active(false);
        }
    }
}

impl<E, T, B> Drop for SourceBinding<E, T, B> {
    fn drop(&mut self) {
        if let Some(job) = self.job.take() {
            job.cancel();
        }
        if let Some((_, handle)) = self.subscription.take() {
            handle.cancel();
        }
    }
}

/// The mediator's broadcast and its sources. The bindings lock serializes
/// registration changes with the plug and unplug sweeps run from the activation
/// hooks.
struct SourceSet<T> {
    broadcast: ColdBroadcast<T>,
    spawner: Arc<dyn Spawner>,
    idle_policy: IdlePolicy,
    bindings: Mutex<Vec<Box<dyn Binding<T>>>>,
}

impl<T> SourceSet<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn add(&self, mut binding: Box<dyn Binding<T>>) {
        let mut bindings = self.bindings.lock();
        if self.broadcast.has_active_subscriptions() {
            binding.plug(&self.broadcast.downgrade(), &self.spawner);
            attune_core::debug!(upstream = %binding.upstream(), "source added and plugged");
        }
        bindings.push(binding);
    }

    fn remove(&self, upstream: BroadcastId) -> usize {
        let mut bindings = self.bindings.lock();
        let before = bindings.len();
        bindings.retain_mut(|binding| {
            if binding.upstream() != upstream {
                return true;
            }
            binding.unplug(true);
            false
        });
        before - bindings.len()
    }

    fn clear(&self) {
        let mut bindings = self.bindings.lock();
        for binding in bindings.iter_mut() {
            binding.unplug(true);
        }
        bindings.clear();
    }

    fn plug_all(&self) {
        let mediator = self.broadcast.downgrade();
        let mut bindings = self.bindings.lock();
        for binding in bindings.iter_mut() {
            binding.plug(&mediator, &self.spawner);
        }
        attune_core::debug!(sources = bindings.len(), "sources plugged");
    }

    fn unplug_all(&self) {
        let release = self.idle_policy == IdlePolicy::ReleaseUpstream;
        let mut bindings = self.bindings.lock();
        for binding in bindings.iter_mut() {
            binding.unplug(release);
        }
        attune_core::debug!(sources = bindings.len(), release, "sources unplugged");
    }
}

/// Activation hooks of the mediator's broadcast. Holds its source set weakly,
/// since the set owns the broadcast.
struct SourceHooks<T>(Weak<SourceSet<T>>);

impl<T> ActivationHooks for SourceHooks<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn on_become_active(&self) {
        if let Some(sources) = self.0.upgrade() {
            sources.plug_all();
        }
    }

    fn on_become_inactive(&self) {
        if let Some(sources) = self.0.upgrade() {
            sources.unplug_all();
        }
    }
}

/// A cold broadcast that plugs its upstream sources while it has active subscribers.
pub struct Mediator<T> {
    sources: Arc<SourceSet<T>>,
}

impl<T> Clone for Mediator<T> {
    fn clone(&self) -> Self {
        Self {
            sources: self.sources.clone(),
        }
    }
}

impl<T> Mediator<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MediatorConfig::default())
    }

    #[must_use]
    pub fn with_config(config: MediatorConfig) -> Self {
        let (config, idle_policy) = config.into_parts();
        let sources = Arc::new_cyclic(|sources| SourceSet {
            spawner: config.spawner().clone(),
            broadcast: ColdBroadcast::with_hooks(config, Arc::new(SourceHooks(sources.clone()))),
            idle_policy,
            bindings: Mutex::new(Vec::new()),
        });
        Self { sources }
    }

    /// Registers `upstream`, forwarding its values unchanged.
    pub fn add_source<B>(&self, upstream: &B)
    where
        B: Broadcast<T> + Clone + 'static,
    {
        self.add_source_with::<T, B, _>(upstream, |value, mediator| mediator.publish(value));
    }

    /// Registers `upstream`, relaying each of its values through `transform`.
    ///
    /// `transform` usually publishes into the mediator it is given. If it fails,
    /// only this source stops forwarding, and its upstream subscription is marked
    /// inactive, until the mediator is next activated.
    /// The source is plugged right away when the mediator is active.
    ///
    /// Adding the same upstream twice registers two independent sources.
    pub fn add_source_with<E, B, F>(&self, upstream: &B, transform: F)
    where
        E: Send + 'static,
        B: Broadcast<E> + Clone + 'static,
        F: Fn(E, &ColdBroadcast<T>) -> Result<()> + Send + Sync + 'static,
    {
        self.sources.add(Box::new(SourceBinding {
            upstream: upstream.clone(),
            transform: Arc::new(transform),
            subscription: None,
            job: None,
        }));
    }

    /// Unplugs and forgets every registration of `upstream`, releasing its
    /// subscriptions. Returns how many were removed; removing an unknown
    /// upstream returns `0`.
    pub fn remove_source<E, B>(&self, upstream: &B) -> usize
    where
        B: Broadcast<E> + ?Sized,
    {
        let removed = self.sources.remove(upstream.id());
        if removed > 0 {
            attune_core::debug!(
                mediator = %self.id(),
                upstream = %upstream.id(),
                removed,
                "source removed"
            );
        }
        removed
    }

    /// Number of registered sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.bindings.lock().len()
    }

    /// Number of sources with a running forwarding loop.
    #[must_use]
    pub fn plugged_count(&self) -> usize {
        self.sources
            .bindings
            .lock()
            .iter()
            .filter(|binding| binding.is_plugged())
            .count()
    }

    #[must_use]
    pub fn id(&self) -> BroadcastId {
        self.sources.broadcast.id()
    }

    /// The underlying broadcast, as handed to transforms.
    #[must_use]
    pub fn as_broadcast(&self) -> &ColdBroadcast<T> {
        &self.sources.broadcast
    }

    /// Opens a subscription; the first active one plugs every source.
    ///
    /// # Panics
    ///
    /// With the default [`TokioSpawner`](attune_core::TokioSpawner), when plugging
    /// sources outside a tokio runtime. Use [`MediatorConfig::with_spawner`] to
    /// run forwarding loops elsewhere.
    pub fn open_subscription(&self) -> Subscription<T> {
        self.sources.broadcast.open_subscription()
    }

    /// # Panics
    ///
    /// See [`open_subscription`](Self::open_subscription) and
    /// [`ColdBroadcast::open_subscription_with`].
    pub fn open_subscription_with<A>(&self, signal: &A) -> Subscription<T>
    where
        A: ActivitySignal + ?Sized,
    {
        self.sources.broadcast.open_subscription_with(signal)
    }

    /// # Errors
    ///
    /// See [`ColdBroadcast::try_open_subscription_with`].
    pub fn try_open_subscription_with<A>(&self, signal: &A) -> Result<Subscription<T>>
    where
        A: ActivitySignal + ?Sized,
    {
        self.sources.broadcast.try_open_subscription_with(signal)
    }

    /// # Errors
    ///
    /// See [`ColdBroadcast::publish`].
    pub fn publish(&self, value: T) -> Result<()> {
        self.sources.broadcast.publish(value)
    }

    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.sources.broadcast.value()
    }

    /// # Errors
    ///
    /// See [`ColdBroadcast::try_value`].
    pub fn try_value(&self) -> Result<T> {
        self.sources.broadcast.try_value()
    }

    /// Removes every source, then closes the broadcast.
    pub fn close(&self) -> bool {
        self.sources.clear();
        self.sources.broadcast.close()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sources.broadcast.is_closed()
    }

    #[must_use]
    pub fn has_active_subscriptions(&self) -> bool {
        self.sources.broadcast.has_active_subscriptions()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sources.broadcast.subscriber_count()
    }

    #[must_use]
    pub fn active_subscription_count(&self) -> usize {
        self.sources.broadcast.active_subscription_count()
    }
}

impl<T> Default for Mediator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Broadcast<T> for Mediator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn id(&self) -> BroadcastId {
        self.sources.broadcast.id()
    }

    fn open_subscription(&self) -> Subscription<T> {
        self.sources.broadcast.open_subscription()
    }

    fn publish(&self, value: T) -> Result<()> {
        self.sources.broadcast.publish(value)
    }

    fn has_active_subscriptions(&self) -> bool {
        self.sources.broadcast.has_active_subscriptions()
    }
}

impl<T> fmt::Debug for Mediator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mediator")
            .field("broadcast", &self.sources.broadcast)
            .field("sources", &self.sources.bindings.lock().len())
            .finish()
    }
}
