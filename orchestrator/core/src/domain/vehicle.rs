// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Vehicle
//!
//! Value types describing a cleaning vehicle and its place in the fleet.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Vehicle identity, availability state and pool views

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier assigned by ground control at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleStatus {
    Available,
    Busy,
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleStatus::Available => f.write_str("Available"),
            VehicleStatus::Busy => f.write_str("Busy"),
        }
    }
}

/// What ground control hands back when a new vehicle is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleDescriptor {
    pub id: VehicleId,
    /// Garage node the vehicle starts from and returns to.
    pub home_node: String,
    /// aircraft id -> node the vehicle must park at when serving that aircraft
    pub service_spots: HashMap<String, String>,
}

/// A vehicle owned by the pool. Only the pool mutates these.
#[derive(Debug, Clone)]
pub struct VehicleRecord {
    pub id: VehicleId,
    pub home_node: String,
    pub current_node: String,
    pub status: VehicleStatus,
    pub service_spots: HashMap<String, String>,
}

impl VehicleRecord {
    /// New records start Available, parked at their home node.
    pub fn from_descriptor(descriptor: VehicleDescriptor) -> Self {
        Self {
            current_node: descriptor.home_node.clone(),
            home_node: descriptor.home_node,
            id: descriptor.id,
            status: VehicleStatus::Available,
            service_spots: descriptor.service_spots,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Available
    }

    pub fn view(&self) -> VehicleStatusView {
        VehicleStatusView {
            vehicle_id: self.id.clone(),
            base_node: self.home_node.clone(),
            current_node: self.current_node.clone(),
            status: self.status,
        }
    }
}

/// Public, copyable projection of a [`VehicleRecord`] used in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStatusView {
    pub vehicle_id: VehicleId,
    pub base_node: String,
    pub current_node: String,
    pub status: VehicleStatus,
}

/// Result of a successful acquire: the vehicle is already Busy when this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredVehicle {
    pub id: VehicleId,
    pub home_node: String,
    /// Service spot registered for the requesting aircraft, if any.
    pub destination_override: Option<String>,
}

impl AcquiredVehicle {
    /// Where this vehicle should go for a request that asked for `requested_node`.
    pub fn destination<'a>(&'a self, requested_node: &'a str) -> &'a str {
        self.destination_override.as_deref().unwrap_or(requested_node)
    }
}
