// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Core types shared by the attune crates: errors, the activity signal contract,
//! the activity-aware capability, the conflated inbox and task spawning.

#[macro_use]
pub mod logging;

pub mod activity;
pub mod activity_aware;
pub mod conflated;
pub mod error;
#[cfg(feature = "runtime-tokio")]
pub mod lifecycle;
pub mod task;

pub use self::activity::{ActivityChanges, ActivitySignal, ActivityState};
pub use self::activity_aware::{untracked, ActivityAware, GateSource, Untracked};
pub use self::conflated::Conflated;
pub use self::error::{AttuneError, Result};
#[cfg(feature = "runtime-tokio")]
pub use self::lifecycle::{Lifecycle, LifecycleSignal};
#[cfg(feature = "runtime-tokio")]
pub use self::task::TokioSpawner;
pub use self::task::{AttuneTask, CancellationToken, Spawner};
