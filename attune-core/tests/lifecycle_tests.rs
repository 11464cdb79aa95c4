// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use attune_core::{ActivitySignal, ActivityState, Lifecycle};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::timeout;

#[test]
fn signal_reports_owner_state() {
    let lifecycle = Lifecycle::new(ActivityState::Inactive);
    let signal = lifecycle.signal();

    assert_eq!(signal.current(), ActivityState::Inactive);
    lifecycle.activate();
    assert_eq!(signal.current(), ActivityState::Active);
}

#[test]
fn terminated_is_final() {
    let lifecycle = Lifecycle::new(ActivityState::Active);

    assert!(lifecycle.terminate());
    assert!(!lifecycle.activate());
    assert!(!lifecycle.terminate());
    assert_eq!(lifecycle.state(), ActivityState::Terminated);
}

#[test]
fn same_state_write_is_ignored() {
    let lifecycle = Lifecycle::new(ActivityState::Active);

    assert!(!lifecycle.activate());
    assert!(lifecycle.deactivate());
}

#[test]
fn dropped_owner_reads_as_terminated() {
    let lifecycle = Lifecycle::new(ActivityState::Active);
    let signal = lifecycle.signal();

    drop(lifecycle);

    assert_eq!(signal.current(), ActivityState::Terminated);
}

#[tokio::test]
async fn changes_yields_transitions_and_ends_after_terminated() -> anyhow::Result<()> {
    // Arrange
    let lifecycle = Lifecycle::new(ActivityState::Inactive);
    let mut changes = lifecycle.signal().changes();

    // Act & Assert
    lifecycle.activate();
    assert_eq!(changes.next().await, Some(ActivityState::Active));

    lifecycle.deactivate();
    assert_eq!(changes.next().await, Some(ActivityState::Inactive));

    lifecycle.terminate();
    assert_eq!(changes.next().await, Some(ActivityState::Terminated));
    assert_eq!(timeout(Duration::from_millis(100), changes.next()).await?, None);
    Ok(())
}

#[tokio::test]
async fn changes_on_terminated_signal_yields_single_terminated() {
    let lifecycle = Lifecycle::new(ActivityState::Active);
    lifecycle.terminate();
    let mut changes = lifecycle.signal().changes();

    assert_eq!(changes.next().await, Some(ActivityState::Terminated));
    assert_eq!(changes.next().await, None);
}

#[tokio::test]
async fn changes_reports_termination_when_owner_dropped() {
    let lifecycle = Lifecycle::new(ActivityState::Active);
    let mut changes = lifecycle.signal().changes();

    drop(lifecycle);

    assert_eq!(changes.next().await, Some(ActivityState::Terminated));
    assert_eq!(changes.next().await, None);
}

#[tokio::test]
async fn changes_does_not_replay_current_state() {
    let lifecycle = Lifecycle::new(ActivityState::Active);
    let mut changes = lifecycle.signal().changes();

    let next = timeout(Duration::from_millis(50), changes.next()).await;

    assert!(next.is_err(), "no transition happened, nothing should be emitted");
}
