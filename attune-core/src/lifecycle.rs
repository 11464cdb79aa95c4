// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! In-process lifecycle: the owner drives state, consumers observe it through a
//! non-owning [`LifecycleSignal`].
//!
//! ```
//! use attune_core::{ActivitySignal, ActivityState, Lifecycle};
//!
//! let lifecycle = Lifecycle::new(ActivityState::Inactive);
//! let signal = lifecycle.signal();
//!
//! lifecycle.activate();
//! assert_eq!(signal.current(), ActivityState::Active);
//!
//! drop(lifecycle);
//! assert_eq!(signal.current(), ActivityState::Terminated);
//! ```

use crate::activity::{ActivityChanges, ActivitySignal, ActivityState};
use futures::stream::{self, StreamExt};
use tokio::sync::watch;

/// Owner side of an activity signal.
///
/// State writes are conflated: observers always see the latest state, possibly
/// skipping intermediate ones. `Terminated` is final. Dropping the owner terminates it.
#[derive(Debug)]
pub struct Lifecycle {
    tx: watch::Sender<ActivityState>,
}

impl Lifecycle {
    #[must_use]
    pub fn new(initial: ActivityState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Current state as seen by the owner.
    #[must_use]
    pub fn state(&self) -> ActivityState {
        *self.tx.borrow()
    }

    /// Moves to `state`. Returns `false` when nothing changed, either because the
    /// state was already `state` or because the lifecycle is terminated.
    pub fn set_state(&self, state: ActivityState) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == state || current.is_terminated() {
                return false;
            }
            crate::trace!(from = %current, to = %state, "lifecycle transition");
            *current = state;
            true
        })
    }

    pub fn activate(&self) -> bool {
        self.set_state(ActivityState::Active)
    }

    pub fn deactivate(&self) -> bool {
        self.set_state(ActivityState::Inactive)
    }

    pub fn terminate(&self) -> bool {
        self.set_state(ActivityState::Terminated)
    }

    /// A non-owning handle observers can hold without keeping the owner alive.
    #[must_use]
    pub fn signal(&self) -> LifecycleSignal {
        LifecycleSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(ActivityState::Inactive)
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Observer side of a [`Lifecycle`].
///
/// Once the owner is gone the signal reports `Terminated`.
#[derive(Debug, Clone)]
pub struct LifecycleSignal {
    rx: watch::Receiver<ActivityState>,
}

impl LifecycleSignal {
    fn owner_gone(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}

impl ActivitySignal for LifecycleSignal {
    fn current(&self) -> ActivityState {
        if self.owner_gone() {
            return ActivityState::Terminated;
        }
        *self.rx.borrow()
    }

    fn changes(&self) -> ActivityChanges {
        let mut rx = self.rx.clone();
        let seen = *rx.borrow_and_update();
        let phase = if seen.is_terminated() || self.owner_gone() {
            Phase::Finishing
        } else {
            Phase::Watching
        };

        stream::unfold((rx, phase), |(mut rx, phase)| async move {
            match phase {
                Phase::Done => None,
                Phase::Finishing => Some((ActivityState::Terminated, (rx, Phase::Done))),
                Phase::Watching => match rx.changed().await {
                    Ok(()) => {
                        let state = *rx.borrow_and_update();
                        let next = if state.is_terminated() {
                            Phase::Done
                        } else {
                            Phase::Watching
                        };
                        Some((state, (rx, next)))
                    }
                    Err(_) => {
                        crate::debug!("lifecycle owner dropped; reporting termination");
                        Some((ActivityState::Terminated, (rx, Phase::Done)))
                    }
                },
            }
        })
        .boxed()
    }
}

#[derive(Clone, Copy)]
enum Phase {
    Watching,
    Finishing,
    Done,
}
