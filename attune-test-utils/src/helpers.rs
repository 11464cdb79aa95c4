// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use futures::stream::StreamExt;
use futures::Stream;
use std::fmt::Debug;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// How long helpers wait for something that is expected to happen.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Polls `stream` for `timeout_ms` and panics if it yields anything.
pub async fn assert_no_element_emitted<S, T>(stream: &mut S, timeout_ms: u64)
where
    S: Stream<Item = T> + Unpin,
    T: Debug,
{
    tokio::select! {
        item = stream.next() => {
            panic!("Unexpected element emitted, expected no output: {item:?}");
        }
        () = sleep(Duration::from_millis(timeout_ms)) => {}
    }
}

/// Next item of `stream`, or a panic if none arrives within [`DEFAULT_TIMEOUT`].
///
/// `None` means the stream ended.
pub async fn expect_next<S>(stream: &mut S) -> Option<S::Item>
where
    S: Stream + Unpin,
{
    timeout(DEFAULT_TIMEOUT, stream.next())
        .await
        .expect("timed out waiting for the next element")
}

/// Gives spawned loops a chance to run.
pub async fn settle() {
    sleep(Duration::from_millis(20)).await;
}

/// Polls `condition` until it holds, panicking after [`DEFAULT_TIMEOUT`].
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let wait = async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    };
    timeout(DEFAULT_TIMEOUT, wait)
        .await
        .expect("condition not met in time");
}
