// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use attune_broadcast::{BroadcastConfig, ColdBroadcast, IdlePolicy, Mediator, MediatorConfig};
use attune_core::{AttuneError, Result, TokioSpawner};
use attune_test_utils::{expect_next, init_test_tracing, settle, wait_until, RecordingHooks};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
#[error("negative reading {0}")]
struct NegativeReading(i32);

fn recorded_upstream() -> (ColdBroadcast<i32>, Arc<RecordingHooks>) {
    let hooks = Arc::new(RecordingHooks::new());
    let upstream = ColdBroadcast::with_hooks(BroadcastConfig::default(), hooks.clone());
    (upstream, hooks)
}

fn reject_negative(value: i32, mediator: &ColdBroadcast<i32>) -> Result<()> {
    if value < 0 {
        return Err(AttuneError::delivery(NegativeReading(value)));
    }
    mediator.publish(value)
}

#[tokio::test]
async fn source_added_while_inactive_is_not_consumed() {
    // Arrange
    let (upstream, hooks) = recorded_upstream();
    let mediator = Mediator::<i32>::new();

    // Act
    mediator.add_source(&upstream);

    // Assert
    assert_eq!(mediator.source_count(), 1);
    assert_eq!(mediator.plugged_count(), 0);
    assert_eq!(upstream.subscriber_count(), 0);
    assert_eq!(hooks.activations(), 0);
}

#[tokio::test]
async fn first_subscriber_plugs_every_source_once() {
    // Arrange
    let (first, first_hooks) = recorded_upstream();
    let (second, second_hooks) = recorded_upstream();
    let mediator = Mediator::<i32>::new();
    mediator.add_source(&first);
    mediator.add_source(&second);

    // Act
    let _one = mediator.open_subscription();
    let _two = mediator.open_subscription();

    // Assert
    assert_eq!(mediator.plugged_count(), 2);
    assert_eq!(first_hooks.activations(), 1);
    assert_eq!(second_hooks.activations(), 1);
    assert_eq!(first.subscriber_count(), 1);
}

#[tokio::test]
async fn forwards_upstream_values() -> anyhow::Result<()> {
    // Arrange
    init_test_tracing();
    let upstream = ColdBroadcast::new();
    let mediator = Mediator::new();
    mediator.add_source(&upstream);
    let mut subscription = mediator.open_subscription();

    // Act
    upstream.publish(5)?;

    // Assert
    assert_eq!(expect_next(&mut subscription).await, Some(5));
    Ok(())
}

#[tokio::test]
async fn transform_maps_upstream_values() -> anyhow::Result<()> {
    // Arrange
    let upstream = ColdBroadcast::<i32>::new();
    let mediator = Mediator::<String>::new();
    mediator.add_source_with(&upstream, |value: i32, out| out.publish(format!("#{value}")));
    let mut subscription = mediator.open_subscription();

    // Act
    upstream.publish(9)?;

    // Assert
    assert_eq!(expect_next(&mut subscription).await.as_deref(), Some("#9"));
    Ok(())
}

#[tokio::test]
async fn last_subscriber_unplugs_and_holds_upstream() -> anyhow::Result<()> {
    // Arrange
    let (upstream, hooks) = recorded_upstream();
    let mediator = Mediator::new();
    mediator.add_source(&upstream);
    let subscription = mediator.open_subscription();

    // Act
    drop(subscription);

    // Assert
    assert_eq!(mediator.plugged_count(), 0);
    assert!(!upstream.has_active_subscriptions());
    assert_eq!(upstream.subscriber_count(), 1);
    assert_eq!(hooks.deactivations(), 1);

    upstream.publish(9)?;
    let _subscription = mediator.open_subscription();
    assert_eq!(hooks.activations(), 2);
    assert_eq!(upstream.subscriber_count(), 1);
    wait_until(|| mediator.value() == Some(9)).await;
    Ok(())
}

#[tokio::test]
async fn release_policy_gives_up_upstream_while_idle() -> anyhow::Result<()> {
    // Arrange
    let (upstream, hooks) = recorded_upstream();
    let mediator =
        Mediator::with_config(MediatorConfig::new().with_idle_policy(IdlePolicy::ReleaseUpstream));
    mediator.add_source(&upstream);
    let subscription = mediator.open_subscription();

    // Act
    drop(subscription);

    // Assert
    assert_eq!(upstream.subscriber_count(), 0);
    assert_eq!(hooks.deactivations(), 1);
    assert_eq!(mediator.source_count(), 1);

    upstream.publish(4)?;
    let _subscription = mediator.open_subscription();
    assert_eq!(upstream.subscriber_count(), 1);
    wait_until(|| mediator.value() == Some(4)).await;
    Ok(())
}

#[tokio::test]
async fn remove_source_releases_upstream_and_is_idempotent() -> anyhow::Result<()> {
    // Arrange
    let upstream = ColdBroadcast::new();
    let mediator = Mediator::new();
    mediator.add_source(&upstream);
    let _subscription = mediator.open_subscription();

    // Act
    let removed = mediator.remove_source(&upstream);
    let removed_again = mediator.remove_source(&upstream);

    // Assert
    assert_eq!(removed, 1);
    assert_eq!(removed_again, 0);
    assert_eq!(mediator.source_count(), 0);
    assert!(!upstream.has_active_subscriptions());
    assert_eq!(upstream.subscriber_count(), 0);

    upstream.publish(3)?;
    settle().await;
    assert_eq!(mediator.value(), None);
    Ok(())
}

#[tokio::test]
async fn re_added_source_behaves_as_fresh_registration() -> anyhow::Result<()> {
    // Arrange
    let upstream = ColdBroadcast::new();
    let mediator = Mediator::new();
    mediator.add_source(&upstream);
    let mut subscription = mediator.open_subscription();
    mediator.remove_source(&upstream);

    // Act
    mediator.add_source(&upstream);
    upstream.publish(8)?;

    // Assert
    assert_eq!(mediator.plugged_count(), 1);
    assert!(upstream.has_active_subscriptions());
    assert_eq!(expect_next(&mut subscription).await, Some(8));
    Ok(())
}

#[tokio::test]
async fn duplicate_registrations_are_independent() {
    // Arrange
    let upstream = ColdBroadcast::<i32>::new();
    let mediator = Mediator::new();

    // Act
    mediator.add_source(&upstream);
    mediator.add_source(&upstream);
    let _subscription = mediator.open_subscription();

    // Assert
    assert_eq!(mediator.source_count(), 2);
    assert_eq!(upstream.active_subscription_count(), 2);
    assert_eq!(mediator.remove_source(&upstream), 2);
    assert!(!upstream.has_active_subscriptions());
}

#[tokio::test]
async fn failing_transform_stops_only_its_source() -> anyhow::Result<()> {
    // Arrange
    init_test_tracing();
    let faulty = ColdBroadcast::new();
    let healthy = ColdBroadcast::new();
    let mediator = Mediator::new();
    mediator.add_source_with(&faulty, reject_negative);
    mediator.add_source(&healthy);
    let subscription = mediator.open_subscription();

    // Act
    faulty.publish(-1)?;
    wait_until(|| mediator.plugged_count() == 1).await;
    healthy.publish(4)?;

    // Assert
    wait_until(|| mediator.value() == Some(4)).await;
    assert_eq!(mediator.source_count(), 2);

    drop(subscription);
    let _subscription = mediator.open_subscription();
    assert_eq!(mediator.plugged_count(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_source_stops_driving_its_upstream() -> anyhow::Result<()> {
    // Arrange
    let (faulty, hooks) = recorded_upstream();
    let mediator = Mediator::new();
    mediator.add_source_with(&faulty, reject_negative);
    let subscription = mediator.open_subscription();
    assert!(faulty.has_active_subscriptions());

    // Act
    faulty.publish(-1)?;

    // Assert
    wait_until(|| mediator.plugged_count() == 0).await;
    assert!(!faulty.has_active_subscriptions());
    assert!(mediator.has_active_subscriptions());
    assert_eq!(hooks.deactivations(), 1);

    drop(subscription);
    let _subscription = mediator.open_subscription();
    assert!(faulty.has_active_subscriptions());
    assert_eq!(hooks.activations(), 2);
    assert_eq!(hooks.deactivations(), 1);
    Ok(())
}

fn upstream_activity(upstreams: &[ColdBroadcast<i32>]) -> usize {
    upstreams
        .iter()
        .map(ColdBroadcast::active_subscription_count)
        .sum()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn registrations_racing_activation_keep_plugs_consistent() {
    // Arrange
    let spawner = TokioSpawner::with_handle(tokio::runtime::Handle::current());
    let mediator = Mediator::<i32>::with_config(MediatorConfig::default().with_spawner(spawner));
    let upstreams: Vec<ColdBroadcast<i32>> = (0..4).map(|_| ColdBroadcast::new()).collect();

    // Act
    std::thread::scope(|scope| {
        for upstream in &upstreams {
            let mediator = &mediator;
            scope.spawn(move || {
                for round in 0..200 {
                    mediator.add_source(upstream);
                    if round % 3 == 0 {
                        mediator.remove_source(upstream);
                    }
                }
            });
        }
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..200 {
                    let subscription = mediator.open_subscription();
                    subscription.cancel();
                }
            });
        }
    });

    // Assert
    assert_eq!(mediator.source_count(), upstreams.len());
    assert_eq!(mediator.plugged_count(), 0);
    assert_eq!(upstream_activity(&upstreams), 0);

    let subscription = mediator.open_subscription();
    assert_eq!(mediator.plugged_count(), mediator.source_count());
    assert_eq!(upstream_activity(&upstreams), mediator.source_count());

    drop(subscription);
    assert_eq!(mediator.plugged_count(), 0);
    assert_eq!(upstream_activity(&upstreams), 0);
}

#[tokio::test]
async fn mediators_chain() -> anyhow::Result<()> {
    // Arrange
    let (upstream, hooks) = recorded_upstream();
    let middle = Mediator::new();
    let outer = Mediator::new();
    middle.add_source(&upstream);
    outer.add_source(&middle);

    // Act
    let mut subscription = outer.open_subscription();
    upstream.publish(6)?;

    // Assert
    assert_eq!(hooks.activations(), 1);
    assert!(middle.has_active_subscriptions());
    assert_eq!(expect_next(&mut subscription).await, Some(6));

    drop(subscription);
    assert!(!upstream.has_active_subscriptions());
    Ok(())
}

#[tokio::test]
async fn close_removes_sources_and_rejects_publish() {
    // Arrange
    let upstream = ColdBroadcast::<i32>::new();
    let mediator = Mediator::new();
    mediator.add_source(&upstream);
    let _subscription = mediator.open_subscription();

    // Act
    let closed = mediator.close();

    // Assert
    assert!(closed);
    assert_eq!(mediator.source_count(), 0);
    assert!(!upstream.has_active_subscriptions());
    assert!(mediator.publish(1).is_err_and(|error| error.is_closed()));
}
