// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Stream adapters: latest-value merge of two streams and activity-gated delivery.

pub mod combine_latest;
pub mod gate;
pub mod race;

pub use combine_latest::{combine_latest, CombineLatest, CombineLatestExt};
pub use gate::{GateExit, GateExt, GatedStream};
pub use race::{race, Race, RaceEvent, RaceOrder};
