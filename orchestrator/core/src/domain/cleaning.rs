// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cleaning
//!
//! Cleaning requests, their validation rules and the batch plan used to
//! split a water amount across capacity-sized vehicle trips.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Request/response contracts and water accounting

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inbound request as received on `POST /request`.
///
/// Fields default to empty/zero so that a missing field is reported through
/// [`ValidationError`] rather than as a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningRequest {
    #[serde(default)]
    pub aircraft_id: String,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub water_amount: i64,
}

impl CleaningRequest {
    pub fn new(aircraft_id: impl Into<String>, node_id: impl Into<String>, water_amount: i64) -> Self {
        Self {
            aircraft_id: aircraft_id.into(),
            node_id: node_id.into(),
            water_amount,
        }
    }

    /// Checks the request and converts it into a [`CleaningOrder`].
    pub fn validate(&self) -> Result<CleaningOrder, ValidationError> {
        if self.aircraft_id.is_empty() || self.node_id.is_empty() {
            return Err(ValidationError::MissingIdentifier);
        }
        let water_amount = u64::try_from(self.water_amount)
            .map_err(|_| ValidationError::NegativeWaterAmount(self.water_amount))?;

        Ok(CleaningOrder {
            aircraft_id: self.aircraft_id.clone(),
            node_id: self.node_id.clone(),
            water_amount,
        })
    }
}

/// A validated request. Water amount is non-negative by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaningOrder {
    pub aircraft_id: String,
    pub node_id: String,
    pub water_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("AircraftId and NodeId are required")]
    MissingIdentifier,

    #[error("WaterAmount must be a non-negative integer (got {0})")]
    NegativeWaterAmount(i64),
}

impl ValidationError {
    /// Error code reported to API callers.
    pub fn error_code(&self) -> u16 {
        match self {
            ValidationError::MissingIdentifier => 100,
            ValidationError::NegativeWaterAmount(_) => 101,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningResponse {
    pub wait: bool,
}

impl CleaningResponse {
    pub fn completed() -> Self {
        Self { wait: true }
    }
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_code: u16,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error_code: u16, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::new(500, "InternalServerError")
    }
}

impl From<&ValidationError> for ErrorBody {
    fn from(err: &ValidationError) -> Self {
        Self::new(err.error_code(), err.to_string())
    }
}

/// Water loads for one batch of concurrently dispatched vehicles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    loads: Vec<u64>,
}

impl BatchPlan {
    /// Plans the next batch for `remaining` water.
    ///
    /// The batch uses as many vehicles as the remaining water needs, capped
    /// at `per_flight_limit`. Every slot carries a full `capacity` except the
    /// last one of the whole request, which carries the remainder.
    pub fn next(remaining: u64, capacity: u64, per_flight_limit: usize) -> Self {
        if remaining == 0 || capacity == 0 {
            return Self { loads: Vec::new() };
        }
        let needed = remaining.div_ceil(capacity);
        let slots = needed.min(per_flight_limit.max(1) as u64);

        let loads = (0..slots)
            .map(|i| capacity.min(remaining - i * capacity))
            .collect();
        Self { loads }
    }

    pub fn loads(&self) -> &[u64] {
        &self.loads
    }

    pub fn vehicle_count(&self) -> usize {
        self.loads.len()
    }

    pub fn total(&self) -> u64 {
        self.loads.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every batch needed to deliver `amount` when capacity and the per-flight
    /// limit stay fixed for the whole request.
    fn plan_batches(amount: u64, capacity: u64, per_flight_limit: usize) -> Vec<BatchPlan> {
        let mut remaining = amount;
        let mut batches = Vec::new();
        while remaining > 0 {
            let batch = BatchPlan::next(remaining, capacity, per_flight_limit);
            if batch.is_empty() {
                break;
            }
            remaining = remaining.saturating_sub(batch.total());
            batches.push(batch);
        }
        batches
    }

    #[test]
    fn test_validate_accepts_zero_water() {
        let order = CleaningRequest::new("parking_1", "parking_1", 0).validate().unwrap();
        assert_eq!(order.water_amount, 0);
    }

    #[test]
    fn test_validate_rejects_missing_ids() {
        let err = CleaningRequest::new("", "parking_1", 10).validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingIdentifier);
        assert_eq!(err.error_code(), 100);

        let err = CleaningRequest::new("parking_1", "", 10).validate().unwrap_err();
        assert_eq!(err.error_code(), 100);
    }

    #[test]
    fn test_validate_only_rejects_empty_ids() {
        // Whitespace is an unusual but present identifier
        let order = CleaningRequest::new(" ", "parking_1", 10).validate().unwrap();
        assert_eq!(order.aircraft_id, " ");
    }

    #[test]
    fn test_validate_rejects_negative_water() {
        let err = CleaningRequest::new("parking_1", "parking_1", -5).validate().unwrap_err();
        assert_eq!(err, ValidationError::NegativeWaterAmount(-5));
        assert_eq!(err.error_code(), 101);
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let request: CleaningRequest = serde_json::from_str(r#"{"nodeId":"n1"}"#).unwrap();
        assert!(request.aircraft_id.is_empty());
        assert_eq!(request.water_amount, 0);
    }

    #[test]
    fn test_plan_250_with_capacity_100() {
        let batches = plan_batches(250, 100, 2);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].loads(), &[100, 100]);
        assert_eq!(batches[1].loads(), &[50]);
    }

    #[test]
    fn test_plan_exact_multiple() {
        let batches = plan_batches(200, 100, 2);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].loads(), &[100, 100]);
    }

    #[test]
    fn test_plan_small_amount_uses_single_vehicle() {
        let batch = BatchPlan::next(30, 100, 2);
        assert_eq!(batch.loads(), &[30]);
    }

    #[test]
    fn test_plan_respects_per_flight_limit() {
        let batch = BatchPlan::next(1_000, 100, 3);
        assert_eq!(batch.vehicle_count(), 3);

        let batch = BatchPlan::next(1_000, 100, 0);
        assert_eq!(batch.vehicle_count(), 1);
    }

    #[test]
    fn test_planned_water_matches_request() {
        for amount in [1_u64, 99, 100, 101, 250, 399, 1_001] {
            let batches = plan_batches(amount, 100, 2);
            let total: u64 = batches.iter().map(BatchPlan::total).sum();
            assert_eq!(total, amount, "amount {amount}");

            let partial: Vec<u64> = batches
                .iter()
                .flat_map(|b| b.loads().iter().copied())
                .filter(|load| *load < 100)
                .collect();
            assert!(partial.len() <= 1, "only the final trip may carry less than capacity");
        }
    }

    #[test]
    fn test_zero_amount_has_no_batches() {
        assert!(plan_batches(0, 100, 2).is_empty());
    }

    #[test]
    fn test_error_body_from_validation() {
        let body = ErrorBody::from(&ValidationError::NegativeWaterAmount(-1));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["errorCode"], 101);
    }
}
