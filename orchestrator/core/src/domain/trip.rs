// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Trip
//!
//! Lifecycle of a single vehicle trip: acquire a vehicle, drive out to the
//! aircraft, service it, drive back and release the vehicle.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Trip state machine and trip failure taxonomy

use crate::domain::coordinator::CoordinatorError;
use crate::domain::vehicle::VehicleId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Trip lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripState {
    /// Waiting for, or registering, a vehicle
    Acquiring,
    /// Driving from the home node to the service spot
    EnRouteOut,
    /// Delivering water at the aircraft
    Servicing,
    /// Driving back to the home node
    EnRouteBack,
    /// Vehicle handed back to the pool
    Released,
}

impl TripState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripState::Released)
    }

    /// Forward steps only, plus a direct jump to `Released` from anywhere on failure.
    pub fn can_transition_to(&self, next: TripState) -> bool {
        match (self, next) {
            (TripState::Released, _) => false,
            (_, TripState::Released) => true,
            (TripState::Acquiring, TripState::EnRouteOut) => true,
            (TripState::EnRouteOut, TripState::Servicing) => true,
            (TripState::Servicing, TripState::EnRouteBack) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TripState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TripState::Acquiring => "acquiring",
            TripState::EnRouteOut => "en_route_out",
            TripState::Servicing => "servicing",
            TripState::EnRouteBack => "en_route_back",
            TripState::Released => "released",
        };
        f.write_str(name)
    }
}

/// Tracks the current state of one trip and rejects illegal jumps.
#[derive(Debug, Clone)]
pub struct Trip {
    pub aircraft_id: String,
    pub water: u64,
    state: TripState,
}

impl Trip {
    pub fn new(aircraft_id: impl Into<String>, water: u64) -> Self {
        Self {
            aircraft_id: aircraft_id.into(),
            water,
            state: TripState::Acquiring,
        }
    }

    pub fn state(&self) -> TripState {
        self.state
    }

    pub fn advance(&mut self, next: TripState) -> Result<(), TripError> {
        if !self.state.can_transition_to(next) {
            return Err(TripError::Internal(format!(
                "invalid trip transition {} -> {}",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Jumps straight to `Released` after a failure and returns the state
    /// the trip failed in.
    pub fn abandon(&mut self) -> TripState {
        std::mem::replace(&mut self.state, TripState::Released)
    }
}

/// Outcome of a completed trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripReport {
    pub vehicle_id: VehicleId,
    pub water_delivered: u64,
}

#[derive(Debug, Error)]
pub enum TripError {
    #[error("vehicle registration failed: {0}")]
    Registration(#[source] CoordinatorError),

    #[error("no usable route from {from} to {to}: {source}")]
    Routing {
        from: String,
        to: String,
        #[source]
        source: CoordinatorError,
    },

    #[error("movement {from} -> {to} still conflicting after {attempts} attempts")]
    ConflictExhausted { from: String, to: String, attempts: u32 },

    #[error("movement {from} -> {to} failed: {source}")]
    Movement {
        from: String,
        to: String,
        #[source]
        source: CoordinatorError,
    },

    #[error("trip aborted: {0}")]
    Internal(String),
}

impl TripError {
    /// Whether the failure points at a bug rather than at ground control.
    /// Only these fail the whole cleaning request.
    pub fn is_internal(&self) -> bool {
        matches!(self, TripError::Internal(_))
    }
}
