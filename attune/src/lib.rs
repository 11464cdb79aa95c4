// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # Attune
//!
//! Latest-value broadcasting that follows its consumers.
//!
//! ## Overview
//!
//! - [`ColdBroadcast`]: one current value, many subscribers, each of which only
//!   ever sees the latest value. Upstream work can start on the first active
//!   subscriber and stop after the last one through [`ActivationHooks`].
//! - [`Mediator`]: a broadcast fed by other broadcasts, consuming them only
//!   while someone consumes the mediator.
//! - [`GateExt::gated`]: delivery paused while an [`ActivitySignal`] is inactive
//!   and resumed with the latest value, never a backlog.
//! - [`CombineLatestExt::combine_latest`]: the latest pair of two streams.
//!
//! ## Quick Start
//!
//! ```rust
//! use attune::prelude::*;
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() -> attune::Result<()> {
//! let screen = Lifecycle::new(ActivityState::Inactive);
//! let prices = ColdBroadcast::new();
//!
//! let mut shown = prices.open_subscription_with(&screen.signal());
//! assert!(!prices.has_active_subscriptions());
//!
//! prices.publish(100)?;
//! prices.publish(101)?;
//! screen.activate();
//!
//! assert_eq!(shown.next().await, Some(101));
//! # Ok(())
//! # }
//! ```

pub use attune_broadcast::{
    ActivationHooks, Broadcast, BroadcastConfig, BroadcastId, ColdBroadcast, IdlePolicy,
    Mediator, MediatorConfig, NoHooks, Subscription, SubscriptionHandle,
};
pub use attune_core::{
    untracked, ActivityAware, ActivityChanges, ActivitySignal, ActivityState, AttuneError,
    AttuneTask, CancellationToken, GateSource, Lifecycle, LifecycleSignal, Result, Spawner,
    TokioSpawner, Untracked,
};
pub use attune_stream::{
    combine_latest, CombineLatest, CombineLatestExt, GateExit, GateExt, GatedStream,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ActivitySignal, ActivityState, Broadcast, ColdBroadcast, CombineLatestExt, GateExt,
        Lifecycle, Mediator, Subscription,
    };
}
