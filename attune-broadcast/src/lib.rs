// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Cold conflated broadcasts.
//!
//! - [`ColdBroadcast`]: one current value, many subscribers, each reading the
//!   latest value from its own inbox. Activation hooks fire when the first
//!   subscriber becomes active and when the last one goes idle.
//! - [`Mediator`]: a cold broadcast fed by upstream broadcasts, consumed only
//!   while the mediator itself is in demand.
//!
//! Hooks and forwarding loops must not form cycles between broadcasts: a mediator
//! that (indirectly) feeds itself deadlocks on activation.

pub mod activation;
pub mod broadcast;
pub mod cold_broadcast;
pub mod config;
pub mod id;
pub mod mediator;
pub mod subscription;

pub use activation::{ActivationHooks, NoHooks};
pub use broadcast::Broadcast;
pub use cold_broadcast::ColdBroadcast;
pub use config::{BroadcastConfig, IdlePolicy, MediatorConfig};
pub use id::BroadcastId;
pub use mediator::Mediator;
pub use subscription::{Subscription, SubscriptionHandle};
