// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use attune_broadcast::{BroadcastConfig, ColdBroadcast};
use attune_core::{ActivityState, AttuneError, Lifecycle};
use attune_test_utils::{
    assert_no_element_emitted, expect_next, init_test_tracing, settle, wait_until, RecordingHooks,
};
use std::sync::Arc;

#[tokio::test]
async fn counts_only_while_signal_is_active() {
    // Arrange
    init_test_tracing();
    let hooks = Arc::new(RecordingHooks::new());
    let broadcast = ColdBroadcast::<i32>::with_hooks(BroadcastConfig::default(), hooks.clone());
    let lifecycle = Lifecycle::new(ActivityState::Inactive);

    // Act
    let subscription = broadcast.open_subscription_with(&lifecycle.signal());

    // Assert
    assert!(!broadcast.has_active_subscriptions());
    assert!(!subscription.handle().is_counted());

    lifecycle.activate();
    wait_until(|| broadcast.has_active_subscriptions()).await;
    assert_eq!(hooks.activations(), 1);

    lifecycle.deactivate();
    wait_until(|| !broadcast.has_active_subscriptions()).await;
    assert_eq!(hooks.deactivations(), 1);
}

#[tokio::test]
async fn active_signal_counts_immediately() {
    // Arrange
    let broadcast = ColdBroadcast::<i32>::new();
    let lifecycle = Lifecycle::new(ActivityState::Active);

    // Act
    let subscription = broadcast.open_subscription_with(&lifecycle.signal());

    // Assert
    assert!(broadcast.has_active_subscriptions());
    assert!(subscription.handle().is_counted());
}

#[tokio::test]
async fn delivers_latest_value_after_reactivation() -> anyhow::Result<()> {
    // Arrange
    let broadcast = ColdBroadcast::new();
    let lifecycle = Lifecycle::new(ActivityState::Inactive);
    let mut subscription = broadcast.open_subscription_with(&lifecycle.signal());

    // Act
    broadcast.publish(1)?;
    settle().await;
    broadcast.publish(2)?;
    settle().await;

    // Assert
    assert_no_element_emitted(&mut subscription, 50).await;

    lifecycle.activate();
    assert_eq!(expect_next(&mut subscription).await, Some(2));
    assert_no_element_emitted(&mut subscription, 50).await;
    Ok(())
}

#[tokio::test]
async fn termination_cancels_subscription() -> anyhow::Result<()> {
    // Arrange
    let broadcast = ColdBroadcast::new();
    let lifecycle = Lifecycle::new(ActivityState::Active);
    let mut subscription = broadcast.open_subscription_with(&lifecycle.signal());
    broadcast.publish(1)?;
    assert_eq!(expect_next(&mut subscription).await, Some(1));

    // Act
    lifecycle.terminate();

    // Assert
    assert_eq!(expect_next(&mut subscription).await, None);
    assert!(subscription.is_cancelled());
    assert!(!broadcast.has_active_subscriptions());
    Ok(())
}

#[tokio::test]
async fn terminated_signal_yields_cancelled_subscription() -> anyhow::Result<()> {
    // Arrange
    let hooks = Arc::new(RecordingHooks::new());
    let broadcast = ColdBroadcast::with_hooks(BroadcastConfig::default(), hooks.clone());
    broadcast.publish(1)?;
    let lifecycle = Lifecycle::new(ActivityState::Terminated);

    // Act
    let mut subscription = broadcast.open_subscription_with(&lifecycle.signal());

    // Assert
    assert!(subscription.is_cancelled());
    assert_eq!(expect_next(&mut subscription).await, None);
    assert_eq!(hooks.activations(), 0);
    assert_eq!(broadcast.subscriber_count(), 0);
    Ok(())
}

#[tokio::test]
async fn cancel_uncounts_immediately() {
    // Arrange
    let broadcast = ColdBroadcast::<i32>::new();
    let lifecycle = Lifecycle::new(ActivityState::Active);
    let subscription = broadcast.open_subscription_with(&lifecycle.signal());

    // Act
    subscription.cancel();
    subscription.cancel();

    // Assert
    assert!(!broadcast.has_active_subscriptions());
    wait_until(|| broadcast.subscriber_count() == 0).await;
}

#[tokio::test]
async fn closing_broadcast_ends_gated_subscription() -> anyhow::Result<()> {
    // Arrange
    let broadcast = ColdBroadcast::new();
    let lifecycle = Lifecycle::new(ActivityState::Active);
    let mut subscription = broadcast.open_subscription_with(&lifecycle.signal());

    // Act
    broadcast.publish(3)?;
    assert_eq!(expect_next(&mut subscription).await, Some(3));
    broadcast.close();

    // Assert
    assert_eq!(expect_next(&mut subscription).await, None);
    wait_until(|| !broadcast.has_active_subscriptions()).await;
    Ok(())
}

#[tokio::test]
async fn try_open_refuses_terminated_signal() {
    // Arrange
    let broadcast = ColdBroadcast::<i32>::new();
    let lifecycle = Lifecycle::new(ActivityState::Active);
    lifecycle.terminate();

    // Act
    let result = broadcast.try_open_subscription_with(&lifecycle.signal());

    // Assert
    assert!(matches!(result, Err(AttuneError::Terminated)));
    assert_eq!(broadcast.subscriber_count(), 0);
}

#[tokio::test]
async fn gated_subscription_on_closed_broadcast_is_never_counted() -> anyhow::Result<()> {
    // Arrange
    let hooks = Arc::new(RecordingHooks::new());
    let broadcast = ColdBroadcast::with_hooks(BroadcastConfig::default(), hooks.clone());
    broadcast.publish(3)?;
    broadcast.close();
    let lifecycle = Lifecycle::new(ActivityState::Active);

    // Act
    let mut subscription = broadcast.open_subscription_with(&lifecycle.signal());

    // Assert
    assert!(!subscription.handle().is_counted());
    assert_eq!(expect_next(&mut subscription).await, Some(3));
    assert_eq!(expect_next(&mut subscription).await, None);
    assert_eq!(hooks.activations(), 0);
    assert!(hooks.edges().is_empty());
    assert!(!broadcast.has_active_subscriptions());
    Ok(())
}
