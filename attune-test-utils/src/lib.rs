// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities for the attune workspace. Not for production code.
//!
//! - [`RecordingHooks`]: activation hooks that count and record every edge.
//! - [`helpers`]: stream assertions with timeouts, so a broken test fails
//!   instead of hanging.
//! - [`init_test_tracing`]: routes log events to the test writer, filtered by
//!   `RUST_LOG`.

pub mod helpers;
pub mod recording_hooks;
pub mod test_tracing;

pub use helpers::{assert_no_element_emitted, expect_next, settle, wait_until, DEFAULT_TIMEOUT};
pub use recording_hooks::{Edge, RecordingHooks};
pub use test_tracing::init_test_tracing;
