// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Simulated Ground Coordinator
//
// Stand-in for ground control and the flight orchestrator when running
// without the rest of the airport stack. Every call succeeds after a short
// configurable delay; movement is always granted.

use crate::domain::coordinator::{CoordinatorError, CoordinatorMode, GroundCoordinator, MoveOutcome};
use crate::domain::service_config::SimulatedCoordinatorConfig;
use crate::domain::vehicle::{VehicleDescriptor, VehicleId};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

pub const INTERMEDIATE_NODE: &str = "MockIntermediate";

pub struct SimulatedCoordinator {
    config: SimulatedCoordinatorConfig,
}

impl SimulatedCoordinator {
    pub fn new(config: SimulatedCoordinatorConfig) -> Self {
        Self { config }
    }

    async fn pause(&self, millis: u64) {
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}

impl Default for SimulatedCoordinator {
    fn default() -> Self {
        Self::new(SimulatedCoordinatorConfig::default())
    }
}

#[async_trait]
impl GroundCoordinator for SimulatedCoordinator {
    async fn register_vehicle(&self, vehicle_type: &str) -> Result<VehicleDescriptor, CoordinatorError> {
        self.pause(self.config.register_delay_ms).await;

        let suffix = Uuid::new_v4().simple().to_string();
        let id = VehicleId::new(format!("{}_{}", vehicle_type, &suffix[..8]));
        info!(vehicle_id = %id, garage = %self.config.garage_node, "SIMULATED: vehicle registered");

        Ok(VehicleDescriptor {
            id,
            home_node: self.config.garage_node.clone(),
            service_spots: self.config.service_spots.clone(),
        })
    }

    async fn get_route(
        &self,
        from: &str,
        to: &str,
        _vehicle_type: &str,
    ) -> Result<Vec<String>, CoordinatorError> {
        self.pause(self.config.route_delay_ms).await;
        Ok(vec![
            from.to_string(),
            INTERMEDIATE_NODE.to_string(),
            to.to_string(),
        ])
    }

    async fn request_move(
        &self,
        _vehicle_id: &VehicleId,
        _vehicle_type: &str,
        _from: &str,
        _to: &str,
    ) -> Result<MoveOutcome, CoordinatorError> {
        self.pause(self.config.move_delay_ms).await;
        Ok(MoveOutcome::Granted {
            distance: self.config.move_distance,
        })
    }

    async fn notify_arrival(
        &self,
        vehicle_id: &VehicleId,
        _vehicle_type: &str,
        node: &str,
    ) -> Result<(), CoordinatorError> {
        self.pause(self.config.notify_delay_ms).await;
        info!(%vehicle_id, node, "SIMULATED: arrival reported");
        Ok(())
    }

    async fn notify_cleaning_start(&self, aircraft_id: &str) -> Result<(), CoordinatorError> {
        self.pause(self.config.notify_delay_ms).await;
        info!(aircraft_id, "SIMULATED: cleaning start reported");
        Ok(())
    }

    async fn notify_cleaning_finish(&self, aircraft_id: &str, water_amount: u64) -> Result<(), CoordinatorError> {
        self.pause(self.config.notify_delay_ms).await;
        info!(aircraft_id, water_amount, "SIMULATED: cleaning finish reported");
        Ok(())
    }

    fn mode(&self) -> CoordinatorMode {
        CoordinatorMode::Simulated
    }
}
