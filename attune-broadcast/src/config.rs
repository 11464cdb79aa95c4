// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Construction-time settings for broadcasts and mediators.

use attune_core::{Spawner, TokioSpawner};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Settings shared by every broadcast.
///
/// The spawner runs the loops a broadcast starts on a consumer's behalf: gated
/// subscriptions and, for mediators, source forwarding.
#[derive(Clone)]
pub struct BroadcastConfig {
    label: Option<Cow<'static, str>>,
    spawner: Arc<dyn Spawner>,
}

impl BroadcastConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name attached to every log event of the broadcast.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_spawner(mut self, spawner: impl Spawner) -> Self {
        self.spawner = Arc::new(spawner);
        self
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn spawner(&self) -> &Arc<dyn Spawner> {
        &self.spawner
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            label: None,
            spawner: Arc::new(TokioSpawner::current()),
        }
    }
}

impl fmt::Debug for BroadcastConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastConfig")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// What a mediator does with its upstream subscriptions while nobody listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdlePolicy {
    /// Keep upstream subscriptions open, marked idle, and reuse them on the next
    /// activation.
    #[default]
    HoldUpstream,
    /// Drop upstream subscriptions on deactivation and resubscribe on activation.
    ReleaseUpstream,
}

#[derive(Debug, Clone, Default)]
pub struct MediatorConfig {
    broadcast: BroadcastConfig,
    idle_policy: IdlePolicy,
}

impl MediatorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.broadcast = self.broadcast.with_label(label);
        self
    }

    #[must_use]
    pub fn with_spawner(mut self, spawner: impl Spawner) -> Self {
        self.broadcast = self.broadcast.with_spawner(spawner);
        self
    }

    #[must_use]
    pub fn with_idle_policy(mut self, idle_policy: IdlePolicy) -> Self {
        self.idle_policy = idle_policy;
        self
    }

    #[must_use]
    pub fn broadcast(&self) -> &BroadcastConfig {
        &self.broadcast
    }

    #[must_use]
    pub fn idle_policy(&self) -> IdlePolicy {
        self.idle_policy
    }

    pub(crate) fn into_parts(self) -> (BroadcastConfig, IdlePolicy) {
        (self.broadcast, self.idle_policy)
    }
}

impl From<BroadcastConfig> for MediatorConfig {
    fn from(broadcast: BroadcastConfig) -> Self {
        Self {
            broadcast,
            idle_policy: IdlePolicy::default(),
        }
    }
}
