// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Events
//!
//! Fleet status events pushed to observers after every vehicle transition.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Status broadcast payloads

use crate::domain::vehicle::{VehicleId, VehicleStatus, VehicleStatusView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What triggered a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FleetChange {
    /// Current state handed to a new subscriber
    Current,
    VehicleRegistered { vehicle_id: VehicleId },
    VehicleDispatched { vehicle_id: VehicleId, aircraft_id: String },
    VehicleMoved { vehicle_id: VehicleId, node: String },
    VehicleReleased { vehicle_id: VehicleId },
    /// Trip failed and the vehicle was put back at its last known node.
    VehicleRecovered { vehicle_id: VehicleId, node: String },
    FleetReset,
}

/// Complete state of the pool at one instant. Observers never need history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub change: FleetChange,
    pub vehicles: Vec<VehicleStatusView>,
    pub published_at: DateTime<Utc>,
}

impl FleetSnapshot {
    pub fn new(change: FleetChange, vehicles: Vec<VehicleStatusView>) -> Self {
        Self {
            change,
            vehicles,
            published_at: Utc::now(),
        }
    }

    pub fn busy_count(&self) -> usize {
        self.vehicles
            .iter()
            .filter(|v| v.status == VehicleStatus::Busy)
            .count()
    }
}
