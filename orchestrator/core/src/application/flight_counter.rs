// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Flight Counter
//!
//! Per-aircraft count of vehicles currently dispatched, with RAII slots so
//! that every trip exit path gives its slot back exactly once.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Per-flight concurrency limit

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Default)]
pub struct FlightCounter {
    counts: Mutex<HashMap<String, usize>>,
    changed: Notify,
}

impl FlightCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vehicles currently dispatched for `aircraft_id`.
    pub fn current(&self, aircraft_id: &str) -> usize {
        self.counts.lock().get(aircraft_id).copied().unwrap_or(0)
    }

    /// Number of aircraft with at least one vehicle out.
    pub fn active_flights(&self) -> usize {
        self.counts.lock().len()
    }

    /// Check-and-increment in one critical section.
    pub fn try_admit(self: &Arc<Self>, aircraft_id: &str, limit: usize) -> Option<FlightSlot> {
        let mut counts = self.counts.lock();
        let count = counts.entry(aircraft_id.to_string()).or_insert(0);
        if *count >= limit {
            if *count == 0 {
                counts.remove(aircraft_id);
            }
            return None;
        }
        *count += 1;
        debug!(aircraft_id, count = *count, "Flight slot taken");

        Some(FlightSlot {
            counter: Arc::clone(self),
            aircraft_id: aircraft_id.to_string(),
        })
    }

    /// Waits until the aircraft is below `limit`, then takes a slot.
    pub async fn admit(self: &Arc<Self>, aircraft_id: &str, limit: usize, recheck: Duration) -> FlightSlot {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(slot) = self.try_admit(aircraft_id, limit) {
                return slot;
            }
            let _ = tokio::time::timeout(recheck, notified).await;
        }
    }

    /// Waits until the aircraft is below `limit` without taking a slot.
    pub async fn wait_below(&self, aircraft_id: &str, limit: usize, recheck: Duration) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.current(aircraft_id) < limit {
                return;
            }
            let _ = tokio::time::timeout(recheck, notified).await;
        }
    }

    /// Forgets every count. Only safe once no slots are outstanding.
    pub fn reset(&self) {
        self.counts.lock().clear();
        self.changed.notify_waiters();
    }

    fn release(&self, aircraft_id: &str) {
        let mut counts = self.counts.lock();
        if let Some(count) = counts.get_mut(aircraft_id) {
            *count = count.saturating_sub(1);
            debug!(aircraft_id, count = *count, "Flight slot returned");
            if *count == 0 {
                counts.remove(aircraft_id);
            }
        }
        drop(counts);
        self.changed.notify_waiters();
    }
}

/// One dispatched vehicle's share of its aircraft's limit. Dropping it
/// decrements the counter, including when a trip task panics.
pub struct FlightSlot {
    counter: Arc<FlightCounter>,
    aircraft_id: String,
}

impl FlightSlot {
    pub fn aircraft_id(&self) -> &str {
        &self.aircraft_id
    }
}

impl Drop for FlightSlot {
    fn drop(&mut self) {
        self.counter.release(&self.aircraft_id);
    }
}

impl std::fmt::Debug for FlightSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightSlot")
            .field("aircraft_id", &self.aircraft_id)
            .finish()
    }
}
