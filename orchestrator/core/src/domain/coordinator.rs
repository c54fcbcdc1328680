// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Coordinator
//!
//! Domain interface to ground control and the flight orchestrator.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anti-corruption layer for the external coordination systems

// Ground Coordinator Domain Interface (Anti-Corruption Layer)
//
// The dispatch engine never talks HTTP directly. Vehicle registration, route
// computation, movement permission and progress notifications all go through
// this trait so the simulated and live backends are interchangeable.
//
// Implementations live in infrastructure/coordinator/.

use crate::domain::vehicle::{VehicleDescriptor, VehicleId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[async_trait]
pub trait GroundCoordinator: Send + Sync {
    /// Register a new vehicle of `vehicle_type` with ground control.
    async fn register_vehicle(&self, vehicle_type: &str) -> Result<VehicleDescriptor, CoordinatorError>;

    /// Ordered node sequence from `from` to `to`, both endpoints included.
    async fn get_route(
        &self,
        from: &str,
        to: &str,
        vehicle_type: &str,
    ) -> Result<Vec<String>, CoordinatorError>;

    /// Ask permission to traverse one edge.
    async fn request_move(
        &self,
        vehicle_id: &VehicleId,
        vehicle_type: &str,
        from: &str,
        to: &str,
    ) -> Result<MoveOutcome, CoordinatorError>;

    async fn notify_arrival(
        &self,
        vehicle_id: &VehicleId,
        vehicle_type: &str,
        node: &str,
    ) -> Result<(), CoordinatorError>;

    async fn notify_cleaning_start(&self, aircraft_id: &str) -> Result<(), CoordinatorError>;

    async fn notify_cleaning_finish(&self, aircraft_id: &str, water_amount: u64) -> Result<(), CoordinatorError>;

    fn mode(&self) -> CoordinatorMode;
}

/// Answer to a movement request for one edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    /// Edge granted; `distance` drives the simulated travel time.
    Granted { distance: f64 },
    /// Edge currently occupied; retry later.
    Conflict,
}

/// Which coordinator backend a service instance was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorMode {
    #[default]
    Simulated,
    Live,
}

impl fmt::Display for CoordinatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorMode::Simulated => f.write_str("simulated"),
            CoordinatorMode::Live => f.write_str("live"),
        }
    }
}

impl std::str::FromStr for CoordinatorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "mock" => Ok(CoordinatorMode::Simulated),
            "live" | "real" => Ok(CoordinatorMode::Live),
            other => Err(format!("unknown coordinator mode '{other}' (expected simulated or live)")),
        }
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("route has {0} node(s), need at least 2")]
    InvalidRoute(usize),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("registration rejected: {0}")]
    RegistrationRejected(String),
}

impl CoordinatorError {
    /// Transport-level failures worth retrying for advisory calls.
    pub fn is_transient(&self) -> bool {
        match self {
            CoordinatorError::Network(_) => true,
            CoordinatorError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
