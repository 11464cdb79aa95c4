// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Activation counting.
//!
//! Every subscription carries a `counted` flag. Flipping it, moving the counter
//! and running the edge hook happen under one lock, so each 0→1 and 1→0 edge
//! fires its hook exactly once and hooks of one broadcast never overlap. The
//! counter itself is atomic so readers never take the lock.

use crate::id::BroadcastId;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::sync::Arc;

/// Reacts to a broadcast gaining its first or losing its last active subscriber.
///
/// Hooks run synchronously on the thread that caused the edge, while the edge is
/// being recorded. They must not open, activate or cancel subscriptions of the
/// same broadcast; doing so deadlocks.
pub trait ActivationHooks: Send + Sync + 'static {
    /// Active subscriber count went from 0 to 1.
    fn on_become_active(&self) {}

    /// Active subscriber count went from 1 to 0.
    fn on_become_inactive(&self) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ActivationHooks for NoHooks {}

pub(crate) struct Activation {
    id: BroadcastId,
    label: Option<Cow<'static, str>>,
    transitions: Mutex<()>,
    count: AtomicUsize,
    hooks: Arc<dyn ActivationHooks>,
}

impl Activation {
    pub(crate) fn new(
        id: BroadcastId,
        label: Option<Cow<'static, str>>,
        hooks: Arc<dyn ActivationHooks>,
    ) -> Self {
        Self {
            id,
            label,
            transitions: Mutex::new(()),
            count: AtomicUsize::new(0),
            hooks,
        }
    }

    pub(crate) fn id(&self) -> BroadcastId {
        self.id
    }

    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Counts a subscription unless it is counted already or cancelled.
    pub(crate) fn activate(&self, counted: &AtomicBool, cancelled: &AtomicBool) -> bool {
        let _transitions = self.transitions.lock();
        if cancelled.load(Ordering::Acquire) {
            return false;
        }
        if counted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        if self.count.fetch_add(1, Ordering::AcqRel) == 0 {
            attune_core::debug!(broadcast = %self.id, label = ?self.label, "became active");
            self.hooks.on_become_active();
        }
        true
    }

    /// Uncounts a subscription that was counted.
    pub(crate) fn deactivate(&self, counted: &AtomicBool) -> bool {
        let _transitions = self.transitions.lock();
        if counted
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        // Writers are serialized by `transitions`.
        let previous = self.count.load(Ordering::Acquire);
        assert!(previous > 0, "activation counter underflow on broadcast {}", self.id);
        self.count.store(previous - 1, Ordering::Release);
        if previous == 1 {
            attune_core::debug!(broadcast = %self.id, label = ?self.label, "became inactive");
            self.hooks.on_become_inactive();
        }
        true
    }
}
