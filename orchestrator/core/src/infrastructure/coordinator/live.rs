// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Live Ground Coordinator Adapter
//
// Anti-Corruption Layer for the ground control HTTP API (registration,
// routing, movement permission, arrival) and the flight orchestrator
// (cleaning start/finish). Wire names are theirs; nothing outside this file
// sees them.

use crate::domain::coordinator::{CoordinatorError, CoordinatorMode, GroundCoordinator, MoveOutcome};
use crate::domain::vehicle::{VehicleDescriptor, VehicleId};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

pub struct LiveCoordinator {
    client: reqwest::Client,
    ground_control_url: String,
    orchestrator_url: String,
}

#[derive(Deserialize)]
struct RegisterVehicleResponse {
    #[serde(rename = "VehicleId", alias = "vehicleId")]
    vehicle_id: String,
    #[serde(rename = "GarrageNodeId", alias = "garrageNodeId")]
    garage_node_id: String,
    #[serde(rename = "ServiceSpots", alias = "serviceSpots", default)]
    service_spots: Option<HashMap<String, String>>,
}

#[derive(Serialize)]
struct RouteRequest<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(rename = "type")]
    vehicle_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest<'a> {
    vehicle_id: &'a str,
    vehicle_type: &'a str,
    from: &'a str,
    to: &'a str,
}

#[derive(Deserialize)]
struct MoveResponse {
    #[serde(alias = "Distance")]
    distance: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArrivedRequest<'a> {
    vehicle_id: &'a str,
    vehicle_type: &'a str,
    node_id: &'a str,
}

#[derive(Serialize)]
struct CleaningStartRequest<'a> {
    aircraft_id: &'a str,
}

#[derive(Serialize)]
struct CleaningFinishRequest<'a> {
    aircraft_id: &'a str,
    water_amount: u64,
}

impl LiveCoordinator {
    pub fn new(
        ground_control_url: impl Into<String>,
        orchestrator_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CoordinatorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoordinatorError::Network(e.to_string()))?;

        Ok(Self {
            client,
            ground_control_url: ground_control_url.into().trim_end_matches('/').to_string(),
            orchestrator_url: orchestrator_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<reqwest::Response, CoordinatorError> {
        debug!(url, "POST");
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| CoordinatorError::Network(e.to_string()))
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, CoordinatorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CoordinatorError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl GroundCoordinator for LiveCoordinator {
    async fn register_vehicle(&self, vehicle_type: &str) -> Result<VehicleDescriptor, CoordinatorError> {
        let url = format!("{}/register-vehicle/{}", self.ground_control_url, vehicle_type);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| CoordinatorError::Network(e.to_string()))?;
        let response = Self::ensure_success(response).await?;

        let registration: RegisterVehicleResponse = response
            .json()
            .await
            .map_err(|e| CoordinatorError::Decode(e.to_string()))?;

        if registration.vehicle_id.is_empty() || registration.garage_node_id.is_empty() {
            return Err(CoordinatorError::RegistrationRejected(
                "response is missing VehicleId or GarrageNodeId".to_string(),
            ));
        }

        Ok(VehicleDescriptor {
            id: VehicleId::new(registration.vehicle_id),
            home_node: registration.garage_node_id,
            service_spots: registration.service_spots.unwrap_or_default(),
        })
    }

    async fn get_route(
        &self,
        from: &str,
        to: &str,
        vehicle_type: &str,
    ) -> Result<Vec<String>, CoordinatorError> {
        let url = format!("{}/route", self.ground_control_url);
        let response = self
            .post(&url, &RouteRequest { from, to, vehicle_type })
            .await?;
        let response = Self::ensure_success(response).await?;

        let route: Vec<String> = response
            .json()
            .await
            .map_err(|e| CoordinatorError::Decode(e.to_string()))?;

        if route.len() < 2 {
            return Err(CoordinatorError::InvalidRoute(route.len()));
        }
        Ok(route)
    }

    async fn request_move(
        &self,
        vehicle_id: &VehicleId,
        vehicle_type: &str,
        from: &str,
        to: &str,
    ) -> Result<MoveOutcome, CoordinatorError> {
        let url = format!("{}/move", self.ground_control_url);
        let request = MoveRequest {
            vehicle_id: vehicle_id.as_str(),
            vehicle_type,
            from,
            to,
        };
        let response = self.post(&url, &request).await?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(MoveOutcome::Conflict);
        }
        let response = Self::ensure_success(response).await?;

        let movement: MoveResponse = response
            .json()
            .await
            .map_err(|e| CoordinatorError::Decode(e.to_string()))?;
        Ok(MoveOutcome::Granted {
            distance: movement.distance,
        })
    }

    async fn notify_arrival(
        &self,
        vehicle_id: &VehicleId,
        vehicle_type: &str,
        node: &str,
    ) -> Result<(), CoordinatorError> {
        let url = format!("{}/arrived", self.ground_control_url);
        let request = ArrivedRequest {
            vehicle_id: vehicle_id.as_str(),
            vehicle_type,
            node_id: node,
        };
        let response = self.post(&url, &request).await?;
        Self::ensure_success(response).await.map(|_| ())
    }

    async fn notify_cleaning_start(&self, aircraft_id: &str) -> Result<(), CoordinatorError> {
        let url = format!("{}/cleaning/start", self.orchestrator_url);
        let response = self.post(&url, &CleaningStartRequest { aircraft_id }).await?;
        Self::ensure_success(response).await.map(|_| ())
    }

    async fn notify_cleaning_finish(&self, aircraft_id: &str, water_amount: u64) -> Result<(), CoordinatorError> {
        let url = format!("{}/cleaning/finish", self.orchestrator_url);
        let response = self
            .post(&url, &CleaningFinishRequest { aircraft_id, water_amount })
            .await?;
        Self::ensure_success(response).await.map(|_| ())
    }

    fn mode(&self) -> CoordinatorMode {
        CoordinatorMode::Live
    }
}
