// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Ground coordinator backends and the factory that picks one at startup.

pub mod live;
pub mod simulated;

use crate::domain::coordinator::{CoordinatorMode, GroundCoordinator};
use crate::domain::service_config::CoordinatorConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use live::LiveCoordinator;
pub use simulated::SimulatedCoordinator;

/// Builds the backend selected by `config.mode`. The choice is fixed for
/// the lifetime of the returned instance.
pub fn build_coordinator(config: &CoordinatorConfig) -> anyhow::Result<Arc<dyn GroundCoordinator>> {
    let coordinator: Arc<dyn GroundCoordinator> = match config.mode {
        CoordinatorMode::Simulated => {
            info!("Using simulated ground coordinator");
            Arc::new(SimulatedCoordinator::new(config.simulated.clone()))
        }
        CoordinatorMode::Live => {
            let ground = config
                .ground_control_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("ground_control_url is required in live mode"))?;
            let orchestrator = config
                .orchestrator_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("orchestrator_url is required in live mode"))?;

            info!(ground_control = %ground, orchestrator = %orchestrator, "Using live ground coordinator");
            Arc::new(LiveCoordinator::new(
                ground,
                orchestrator,
                Duration::from_millis(config.request_timeout_ms),
            )?)
        }
    };
    Ok(coordinator)
}
