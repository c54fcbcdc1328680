// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Vehicle Pool
//!
//! Owns every vehicle record and its Available/Busy state, and enforces the
//! fleet-wide vehicle cap.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Race-free acquire/release of pooled vehicles
//!
//! All mutations happen under one mutex. Readers get point-in-time copies.
//! Waiters park on a [`Notify`] that fires on every release, registration
//! and reset; a re-check interval bounds any missed wakeup.

use crate::domain::vehicle::{
    AcquiredVehicle, VehicleDescriptor, VehicleId, VehicleRecord, VehicleStatus, VehicleStatusView,
};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

pub struct VehiclePool {
    max_vehicles: usize,
    records: Mutex<Vec<VehicleRecord>>,
    changed: Notify,
}

impl VehiclePool {
    pub fn new(max_vehicles: usize) -> Self {
        Self {
            max_vehicles,
            records: Mutex::new(Vec::with_capacity(max_vehicles)),
            changed: Notify::new(),
        }
    }

    pub fn max_vehicles(&self) -> usize {
        self.max_vehicles
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Whether the fleet cap still has room. Advisory only: the answer can
    /// be stale by the time the caller acts, so [`Self::try_register`] is the
    /// real gate.
    pub fn can_register(&self) -> bool {
        self.records.lock().len() < self.max_vehicles
    }

    /// Inserts a new Available vehicle iff the cap still has room and the id
    /// is not already known.
    pub fn try_register(&self, descriptor: VehicleDescriptor) -> bool {
        let mut records = self.records.lock();
        if records.len() >= self.max_vehicles {
            warn!(vehicle_id = %descriptor.id, "Fleet limit reached, cannot add vehicle");
            return false;
        }
        if records.iter().any(|r| r.id == descriptor.id) {
            warn!(vehicle_id = %descriptor.id, "Vehicle already registered");
            return false;
        }

        info!(vehicle_id = %descriptor.id, home_node = %descriptor.home_node, "Vehicle added to pool");
        records.push(VehicleRecord::from_descriptor(descriptor));
        drop(records);

        self.changed.notify_waiters();
        true
    }

    /// Claims the first Available vehicle for `aircraft_id`, flipping it to
    /// Busy in the same critical section.
    pub fn acquire(&self, aircraft_id: &str) -> Option<AcquiredVehicle> {
        let mut records = self.records.lock();
        let record = records.iter_mut().find(|r| r.is_available())?;
        record.status = VehicleStatus::Busy;

        debug!(vehicle_id = %record.id, aircraft_id, "Vehicle acquired");
        Some(AcquiredVehicle {
            id: record.id.clone(),
            home_node: record.home_node.clone(),
            destination_override: record.service_spots.get(aircraft_id).cloned(),
        })
    }

    /// Returns false if the vehicle is unknown.
    pub fn mark_busy(&self, id: &VehicleId) -> bool {
        let mut records = self.records.lock();
        match records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.status = VehicleStatus::Busy;
                true
            }
            None => false,
        }
    }

    /// Makes the vehicle Available again, parked at `node`.
    pub fn mark_available(&self, id: &VehicleId, node: &str) -> bool {
        let mut records = self.records.lock();
        let found = match records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.status = VehicleStatus::Available;
                record.current_node = node.to_string();
                true
            }
            None => false,
        };
        drop(records);

        if found {
            self.changed.notify_waiters();
        }
        found
    }

    pub fn update_location(&self, id: &VehicleId, node: &str) -> bool {
        let mut records = self.records.lock();
        match records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.current_node = node.to_string();
                true
            }
            None => false,
        }
    }

    /// Registration-ordered copy of every vehicle.
    pub fn snapshot(&self) -> Vec<VehicleStatusView> {
        self.records.lock().iter().map(VehicleRecord::view).collect()
    }

    pub fn busy_count(&self) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.status == VehicleStatus::Busy)
            .count()
    }

    /// Fleet at cap and nobody Available: new work has to wait.
    pub fn is_saturated(&self) -> bool {
        let records = self.records.lock();
        records.len() >= self.max_vehicles && records.iter().all(|r| !r.is_available())
    }

    /// Drops every record. Callers quiesce in-flight trips first.
    pub fn reset(&self) {
        self.records.lock().clear();
        info!("Vehicle pool reset");
        self.changed.notify_waiters();
    }

    /// Resolves once the pool is not saturated.
    pub async fn wait_until_admissible(&self, recheck: Duration) {
        self.wait_for(recheck, || !self.is_saturated()).await;
    }

    /// Completes on the next release, registration or reset. Call
    /// `enable()` on it before inspecting the pool.
    pub fn notified(&self) -> Notified<'_> {
        self.changed.notified()
    }

    async fn wait_for(&self, recheck: Duration, ready: impl Fn() -> bool) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register interest before checking so a release in between is not lost
            notified.as_mut().enable();

            if ready() {
                return;
            }
            let _ = tokio::time::timeout(recheck, notified).await;
        }
    }
}
