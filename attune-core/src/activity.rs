// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! External activity signal consumed by gates and gated subscriptions.

use core::fmt;
use core::pin::Pin;
use futures::Stream;

/// Boxed stream of activity transitions returned by [`ActivitySignal::changes`].
pub type ActivityChanges = Pin<Box<dyn Stream<Item = ActivityState> + Send + 'static>>;

/// State reported by an [`ActivitySignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityState {
    /// Consumers should receive values.
    Active,
    /// Consumers are paused; values are conflated until reactivation.
    Inactive,
    /// Final state. Nothing is delivered afterwards.
    Terminated,
}

impl ActivityState {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    #[must_use]
    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// An observable source of [`ActivityState`].
///
/// Implementations must:
/// - answer [`current`](Self::current) synchronously,
/// - return from [`changes`](Self::changes) a stream of the transitions that happen after the call,
/// - emit `Terminated` exactly once, as the last item of every changes stream.
///
/// A changes stream that ends without `Terminated` is treated as if the owner of the
/// signal went away, which is the same as termination.
pub trait ActivitySignal: Send + Sync {
    /// The state right now.
    fn current(&self) -> ActivityState;

    /// Subsequent transitions.
    fn changes(&self) -> ActivityChanges;
}

impl<S: ActivitySignal + ?Sized> ActivitySignal for &S {
    fn current(&self) -> ActivityState {
        (**self).current()
    }

    fn changes(&self) -> ActivityChanges {
        (**self).changes()
    }
}

impl<S: ActivitySignal + ?Sized> ActivitySignal for std::sync::Arc<S> {
    fn current(&self) -> ActivityState {
        (**self).current()
    }

    fn changes(&self) -> ActivityChanges {
        (**self).changes()
    }
}
