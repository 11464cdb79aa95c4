// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use attune_broadcast::ActivationHooks;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An activation edge, as seen by [`RecordingHooks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Active,
    Inactive,
}

/// Activation hooks that count edges and keep them in order.
///
/// Also flags overlapping hook calls, which would mean two edges were reported
/// concurrently.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    activations: AtomicUsize,
    deactivations: AtomicUsize,
    in_flight: AtomicUsize,
    overlaps: AtomicUsize,
    edges: Mutex<Vec<Edge>>,
}

impl RecordingHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }

    /// Number of hook calls that started while another one was running.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.edges.lock().clone()
    }

    fn record(&self, edge: Edge, counter: &AtomicUsize) {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        counter.fetch_add(1, Ordering::SeqCst);
        self.edges.lock().push(edge);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ActivationHooks for RecordingHooks {
    fn on_become_active(&self) {
        self.record(Edge::Active, &self.activations);
    }

    fn on_become_inactive(&self) {
        self.record(Edge::Inactive, &self.deactivations);
    }
}
