// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Dispatcher
//!
//! Turns a cleaning request into batches of concurrent vehicle trips under
//! the per-flight and fleet-wide limits, and exposes the administrative
//! operations (bulk registration, settings, reload).
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Cleaning request orchestration
//!
//! # Request flow
//!
//! 1. Validate; nothing else happens for a malformed request.
//! 2. Tell the orchestrator cleaning started (advisory).
//! 3. While water remains: wait for the aircraft to drop below its vehicle
//!    limit, plan a batch, wait until the fleet is not saturated, take one
//!    flight slot per vehicle, spawn the trips and join them all.
//! 4. Tell the orchestrator cleaning finished (advisory) and answer
//!    `{ "wait": true }`.
//!
//! A trip that fails on ground control (registration, routing, movement)
//! is abandoned on its own and its load still counts against the request.
//! Only internal failures and aborted trip tasks fail the request.
//!
//! Every request runs on its own task holding a read guard on the reload
//! gate, so a dropped HTTP connection never strands a half-run batch and
//! `reload` can wait for in-flight work before clearing state.

use crate::application::flight_counter::FlightCounter;
use crate::application::retry::advisory;
use crate::application::settings::{DispatchSettings, SettingsError, SettingsStore, SettingsUpdate};
use crate::application::trip_runner::{DispatchTimings, TripOrder, TripRunner};
use crate::application::vehicle_pool::VehiclePool;
use crate::domain::cleaning::{BatchPlan, CleaningOrder, CleaningRequest, CleaningResponse, ValidationError};
use crate::domain::coordinator::{CoordinatorError, CoordinatorMode, GroundCoordinator};
use crate::domain::events::FleetChange;
use crate::domain::service_config::DispatchConfig;
use crate::domain::trip::TripError;
use crate::domain::vehicle::VehicleStatusView;
use crate::infrastructure::event_bus::{FleetStatusBus, FleetStatusReceiver};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("trip for aircraft {aircraft_id} failed: {source}")]
    Trip {
        aircraft_id: String,
        #[source]
        source: TripError,
    },

    #[error("vehicle registration failed: {0}")]
    Registration(#[source] CoordinatorError),

    #[error("invalid vehicle type")]
    InvalidVehicleType,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Entry point used by the HTTP layer.
#[async_trait]
pub trait CleaningService: Send + Sync {
    /// Resolves once all requested water has been delivered.
    async fn request_cleaning(&self, request: CleaningRequest) -> Result<CleaningResponse, DispatchError>;

    /// Registers up to the configured bulk count; returns how many joined the pool.
    async fn register_vehicles(&self, vehicle_type: &str) -> Result<usize, DispatchError>;

    /// Waits for in-flight requests, then clears the pool and flight counters.
    async fn reload(&self);

    fn fleet(&self) -> Vec<VehicleStatusView>;

    fn subscribe(&self) -> FleetStatusReceiver;

    fn settings(&self) -> DispatchSettings;

    fn update_settings(&self, update: &SettingsUpdate) -> Result<DispatchSettings, SettingsError>;

    fn set_capacity(&self, capacity: i64) -> Result<u64, SettingsError>;

    fn coordinator_mode(&self) -> CoordinatorMode;
}

#[derive(Clone)]
pub struct Dispatcher {
    pool: Arc<VehiclePool>,
    flights: Arc<FlightCounter>,
    settings: Arc<SettingsStore>,
    coordinator: Arc<dyn GroundCoordinator>,
    bus: FleetStatusBus,
    runner: TripRunner,
    timings: DispatchTimings,
    gate: Arc<RwLock<()>>,
}

impl Dispatcher {
    pub fn new(
        coordinator: Arc<dyn GroundCoordinator>,
        config: &DispatchConfig,
        vehicle_type: impl Into<String>,
    ) -> Self {
        let pool = Arc::new(VehiclePool::new(config.max_vehicles_total));
        let settings = Arc::new(SettingsStore::new(DispatchSettings::from(config)));
        let bus = FleetStatusBus::new(config.status_channel_capacity);
        let timings = DispatchTimings::from(config);
        let runner = TripRunner::new(
            pool.clone(),
            coordinator.clone(),
            bus.clone(),
            settings.clone(),
            timings,
            vehicle_type,
        );

        Self {
            pool,
            flights: Arc::new(FlightCounter::new()),
            settings,
            coordinator,
            bus,
            runner,
            timings,
            gate: Arc::new(RwLock::new(())),
        }
    }

    pub fn pool(&self) -> &Arc<VehiclePool> {
        &self.pool
    }

    pub fn flights(&self) -> &Arc<FlightCounter> {
        &self.flights
    }

    async fn process(&self, order: CleaningOrder) -> Result<(), DispatchError> {
        info!(
            aircraft_id = %order.aircraft_id,
            node_id = %order.node_id,
            water_amount = order.water_amount,
            "Processing cleaning request"
        );

        let coordinator = &self.coordinator;
        advisory(self.timings.notify_policy, "cleaning start", || {
            coordinator.notify_cleaning_start(&order.aircraft_id)
        })
        .await;

        let recheck = self.timings.admission_recheck;
        let mut remaining = order.water_amount;

        while remaining > 0 {
            let settings = self.settings.current();
            let limit = settings.max_vehicles_per_flight.max(1);

            self.flights.wait_below(&order.aircraft_id, limit, recheck).await;
            let batch = BatchPlan::next(remaining, settings.vehicle_capacity, limit);
            if batch.is_empty() {
                return Err(DispatchError::Internal(format!(
                    "cannot plan a batch for {} water with capacity {}",
                    remaining, settings.vehicle_capacity
                )));
            }

            if self.pool.is_saturated() {
                info!(aircraft_id = %order.aircraft_id, "Fleet saturated, waiting for a vehicle");
            }
            self.pool.wait_until_admissible(recheck).await;

            let mut handles = Vec::with_capacity(batch.vehicle_count());
            for &water in batch.loads() {
                let slot = self.flights.admit(&order.aircraft_id, limit, recheck).await;
                let trip = TripOrder {
                    aircraft_id: order.aircraft_id.clone(),
                    node_id: order.node_id.clone(),
                    water,
                };
                handles.push(tokio::spawn(self.runner.clone().run(trip, slot)));
            }

            let mut failure = None;
            for outcome in join_all(handles).await {
                match outcome {
                    Ok(Ok(_report)) => {}
                    Ok(Err(source)) if !source.is_internal() => {
                        // The trip already released its vehicle and slot
                        warn!(
                            aircraft_id = %order.aircraft_id,
                            error = %source,
                            "Trip abandoned, continuing with the request"
                        );
                    }
                    Ok(Err(source)) => {
                        failure.get_or_insert(DispatchError::Trip {
                            aircraft_id: order.aircraft_id.clone(),
                            source,
                        });
                    }
                    Err(join_error) => {
                        error!(aircraft_id = %order.aircraft_id, error = %join_error, "Trip task aborted");
                        failure.get_or_insert(DispatchError::Internal(join_error.to_string()));
                    }
                }
            }
            if let Some(err) = failure {
                return Err(err);
            }

            remaining = remaining.saturating_sub(batch.total());
            info!(aircraft_id = %order.aircraft_id, remaining, "Batch complete");
        }

        advisory(self.timings.notify_policy, "cleaning finish", || {
            coordinator.notify_cleaning_finish(&order.aircraft_id, order.water_amount)
        })
        .await;

        Ok(())
    }
}

#[async_trait]
impl CleaningService for Dispatcher {
    async fn request_cleaning(&self, request: CleaningRequest) -> Result<CleaningResponse, DispatchError> {
        let order = request.validate().inspect_err(|e| {
            warn!(aircraft_id = %request.aircraft_id, error = %e, "Rejected cleaning request");
        })?;

        let guard = self.gate.clone().read_owned().await;
        let this = self.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            this.process(order).await
        });

        let result = match task.await {
            Ok(result) => result,
            Err(join_error) => Err(DispatchError::Internal(join_error.to_string())),
        };

        match &result {
            Ok(()) => metrics::counter!("cleaning_requests_total", "outcome" => "completed").increment(1),
            Err(e) => {
                metrics::counter!("cleaning_requests_total", "outcome" => "failed").increment(1);
                error!(aircraft_id = %request.aircraft_id, error = %e, "Cleaning request failed");
            }
        }
        result.map(|()| CleaningResponse::completed())
    }

    async fn register_vehicles(&self, vehicle_type: &str) -> Result<usize, DispatchError> {
        if vehicle_type.trim().is_empty() {
            return Err(DispatchError::InvalidVehicleType);
        }
        let _guard = self.gate.read().await;
        let wanted = self.settings.current().number_of_cleaning_vehicles;

        let mut registered = 0;
        for _ in 0..wanted {
            if !self.pool.can_register() {
                info!(registered, "Fleet limit reached during bulk registration");
                break;
            }
            let descriptor = self
                .coordinator
                .register_vehicle(vehicle_type)
                .await
                .map_err(DispatchError::Registration)?;
            let vehicle_id = descriptor.id.clone();

            if self.pool.try_register(descriptor) {
                registered += 1;
                metrics::counter!("cleaning_vehicles_registered_total").increment(1);
                self.bus.publish(FleetChange::VehicleRegistered { vehicle_id }, self.pool.snapshot());
            }
        }

        info!(registered, wanted, "Bulk vehicle registration finished");
        Ok(registered)
    }

    async fn reload(&self) {
        info!("Reload requested, waiting for in-flight requests");
        let _guard = self.gate.write().await;
        self.pool.reset();
        self.flights.reset();
        self.bus.publish(FleetChange::FleetReset, Vec::new());
        info!("Vehicle pool and flight counters cleared");
    }

    fn fleet(&self) -> Vec<VehicleStatusView> {
        self.pool.snapshot()
    }

    fn subscribe(&self) -> FleetStatusReceiver {
        self.bus.subscribe()
    }

    fn settings(&self) -> DispatchSettings {
        self.settings.current()
    }

    fn update_settings(&self, update: &SettingsUpdate) -> Result<DispatchSettings, SettingsError> {
        self.settings.apply(update)
    }

    fn set_capacity(&self, capacity: i64) -> Result<u64, SettingsError> {
        self.settings.set_capacity(capacity)
    }

    fn coordinator_mode(&self) -> CoordinatorMode {
        self.coordinator.mode()
    }
}
