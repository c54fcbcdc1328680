// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Settings
//!
//! Administratively mutable dispatch parameters. Seeded from the service
//! configuration and read as a copy at each decision point.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Runtime-adjustable capacity, speed and retry bounds

use crate::domain::service_config::DispatchConfig;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSettings {
    pub vehicle_capacity: u64,
    pub movement_speed: f64,
    pub conflict_retry_count: u32,
    /// Vehicles registered by one bulk registration call
    pub number_of_cleaning_vehicles: usize,
    pub max_vehicles_per_flight: usize,
}

impl From<&DispatchConfig> for DispatchSettings {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            vehicle_capacity: config.vehicle_capacity,
            movement_speed: config.movement_speed,
            conflict_retry_count: config.conflict_retry_bound,
            number_of_cleaning_vehicles: config.bulk_registration_count,
            max_vehicles_per_flight: config.max_vehicles_per_flight,
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

/// Partial update from the admin API. Absent fields are left unchanged.
/// PascalCase aliases accept payloads from older admin dashboards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default, alias = "ConflictRetryCount")]
    pub conflict_retry_count: Option<i64>,
    #[serde(default, alias = "MovementSpeed")]
    pub movement_speed: Option<f64>,
    #[serde(default, alias = "NumberOfCleaningVehicles")]
    pub number_of_cleaning_vehicles: Option<i64>,
    #[serde(default, alias = "VehicleCapacity")]
    pub vehicle_capacity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("Capacity must be a positive integer (got {0})")]
    InvalidCapacity(i64),

    #[error("MovementSpeed must be a positive number (got {0})")]
    InvalidSpeed(f64),

    #[error("ConflictRetryCount must be a positive integer (got {0})")]
    InvalidRetryCount(i64),

    #[error("NumberOfCleaningVehicles must not be negative (got {0})")]
    InvalidVehicleCount(i64),
}

pub struct SettingsStore {
    inner: RwLock<DispatchSettings>,
}

impl SettingsStore {
    pub fn new(settings: DispatchSettings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    pub fn current(&self) -> DispatchSettings {
        self.inner.read().clone()
    }

    /// Validates every field first; nothing changes if any field is invalid.
    pub fn apply(&self, update: &SettingsUpdate) -> Result<DispatchSettings, SettingsError> {
        let capacity = update.vehicle_capacity.map(parse_capacity).transpose()?;

        let speed = match update.movement_speed {
            Some(speed) if !(speed.is_finite() && speed > 0.0) => {
                return Err(SettingsError::InvalidSpeed(speed))
            }
            other => other,
        };

        let retries = update
            .conflict_retry_count
            .map(|n| u32::try_from(n).ok().filter(|n| *n > 0).ok_or(SettingsError::InvalidRetryCount(n)))
            .transpose()?;

        let vehicles = update
            .number_of_cleaning_vehicles
            .map(|n| usize::try_from(n).map_err(|_| SettingsError::InvalidVehicleCount(n)))
            .transpose()?;

        let mut settings = self.inner.write();
        if let Some(capacity) = capacity {
            settings.vehicle_capacity = capacity;
        }
        if let Some(speed) = speed {
            settings.movement_speed = speed;
        }
        if let Some(retries) = retries {
            settings.conflict_retry_count = retries;
        }
        if let Some(vehicles) = vehicles {
            settings.number_of_cleaning_vehicles = vehicles;
        }
        info!(settings = ?*settings, "Dispatch settings updated");
        Ok(settings.clone())
    }

    pub fn set_capacity(&self, capacity: i64) -> Result<u64, SettingsError> {
        let capacity = parse_capacity(capacity)?;
        self.inner.write().vehicle_capacity = capacity;
        info!(capacity, "Vehicle capacity updated");
        Ok(capacity)
    }
}

fn parse_capacity(value: i64) -> Result<u64, SettingsError> {
    u64::try_from(value)
        .ok()
        .filter(|c| *c > 0)
        .ok_or(SettingsError::InvalidCapacity(value))
}
