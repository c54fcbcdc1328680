// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Trip Runner
//!
//! Drives one vehicle through a trip: acquire (registering a new vehicle
//! when the fleet has room), travel out edge by edge under ground-control
//! movement permission, service the aircraft, travel back, release.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Trip execution with guaranteed vehicle and slot release
//!
//! A trip owns two guards. The [`FlightSlot`] is taken before the trip is
//! spawned; the vehicle lease is taken once a vehicle is acquired. The lease
//! is always dropped first, so a failed trip puts its vehicle back (and
//! broadcasts that) before the flight counter goes down.

use crate::application::flight_counter::FlightSlot;
use crate::application::retry::{advisory, RetryPolicy};
use crate::application::settings::SettingsStore;
use crate::application::vehicle_pool::VehiclePool;
use crate::domain::coordinator::{CoordinatorError, GroundCoordinator, MoveOutcome};
use crate::domain::events::FleetChange;
use crate::domain::service_config::DispatchConfig;
use crate::domain::trip::{Trip, TripError, TripReport, TripState};
use crate::domain::vehicle::{AcquiredVehicle, VehicleId};
use crate::infrastructure::event_bus::FleetStatusBus;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Fixed timings taken from configuration at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTimings {
    pub conflict_retry_interval: Duration,
    pub notify_policy: RetryPolicy,
    pub admission_recheck: Duration,
    pub service_duration: Duration,
    pub travel_time_unit: Duration,
}

impl From<&DispatchConfig> for DispatchTimings {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            conflict_retry_interval: Duration::from_millis(config.conflict_retry_interval_ms),
            notify_policy: RetryPolicy::new(
                config.notify_retry_attempts,
                Duration::from_millis(config.notify_retry_backoff_ms),
            ),
            admission_recheck: Duration::from_millis(config.admission_recheck_ms.max(1)),
            service_duration: Duration::from_millis(config.service_duration_ms),
            travel_time_unit: Duration::from_millis(config.travel_time_unit_ms),
        }
    }
}

/// Work order for a single vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripOrder {
    pub aircraft_id: String,
    pub node_id: String,
    pub water: u64,
}

/// `ceil(distance / speed)` time units. Degenerate inputs mean no hold.
pub fn travel_time(distance: f64, speed: f64, unit: Duration) -> Duration {
    let units = (distance / speed).ceil();
    if !units.is_finite() || units <= 0.0 {
        return Duration::ZERO;
    }
    let units = if units >= u32::MAX as f64 { u32::MAX } else { units as u32 };
    unit.saturating_mul(units)
}

#[derive(Clone)]
pub struct TripRunner {
    pool: Arc<VehiclePool>,
    coordinator: Arc<dyn GroundCoordinator>,
    bus: FleetStatusBus,
    settings: Arc<SettingsStore>,
    timings: DispatchTimings,
    vehicle_type: String,
}

impl TripRunner {
    pub fn new(
        pool: Arc<VehiclePool>,
        coordinator: Arc<dyn GroundCoordinator>,
        bus: FleetStatusBus,
        settings: Arc<SettingsStore>,
        timings: DispatchTimings,
        vehicle_type: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            coordinator,
            bus,
            settings,
            timings,
            vehicle_type: vehicle_type.into(),
        }
    }

    /// Runs the trip to completion. `slot` is held until everything else,
    /// vehicle release included, is done.
    pub async fn run(self, order: TripOrder, slot: FlightSlot) -> Result<TripReport, TripError> {
        let _slot = slot;
        metrics::counter!("cleaning_trips_started_total").increment(1);

        let mut trip = Trip::new(order.aircraft_id.clone(), order.water);
        let result = self.drive(&mut trip, &order).await;

        match &result {
            Ok(report) => {
                metrics::counter!("cleaning_trips_completed_total").increment(1);
                info!(
                    aircraft_id = %order.aircraft_id,
                    vehicle_id = %report.vehicle_id,
                    water = report.water_delivered,
                    "Trip completed"
                );
            }
            Err(e) => {
                metrics::counter!("cleaning_trips_failed_total").increment(1);
                let failed_in = trip.abandon();
                error!(
                    aircraft_id = %order.aircraft_id,
                    %failed_in,
                    trip_state = %trip.state(),
                    error = %e,
                    "Trip failed"
                );
            }
        }
        result
    }

    async fn drive(&self, trip: &mut Trip, order: &TripOrder) -> Result<TripReport, TripError> {
        let vehicle = self.acquire(&order.aircraft_id).await?;
        let mut lease = VehicleLease::new(self.pool.clone(), self.bus.clone(), &vehicle);
        self.bus.publish(
            FleetChange::VehicleDispatched {
                vehicle_id: vehicle.id.clone(),
                aircraft_id: order.aircraft_id.clone(),
            },
            self.pool.snapshot(),
        );

        let destination = vehicle.destination(&order.node_id).to_string();
        info!(
            vehicle_id = %vehicle.id,
            aircraft_id = %order.aircraft_id,
            destination = %destination,
            water = order.water,
            "Vehicle dispatched"
        );

        trip.advance(TripState::EnRouteOut)?;
        self.travel(&mut lease, &vehicle.home_node, &destination).await?;

        trip.advance(TripState::Servicing)?;
        info!(vehicle_id = %vehicle.id, water = order.water, "Servicing aircraft");
        tokio::time::sleep(self.timings.service_duration).await;

        trip.advance(TripState::EnRouteBack)?;
        self.travel(&mut lease, &destination, &vehicle.home_node).await?;

        trip.advance(TripState::Released)?;
        lease.release(&vehicle.home_node);

        Ok(TripReport {
            vehicle_id: vehicle.id,
            water_delivered: order.water,
        })
    }

    async fn acquire(&self, aircraft_id: &str) -> Result<AcquiredVehicle, TripError> {
        loop {
            let notified = self.pool.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(vehicle) = self.pool.acquire(aircraft_id) {
                return Ok(vehicle);
            }

            if self.pool.can_register() {
                let descriptor = self
                    .coordinator
                    .register_vehicle(&self.vehicle_type)
                    .await
                    .map_err(TripError::Registration)?;
                let vehicle_id = descriptor.id.clone();

                if self.pool.try_register(descriptor) {
                    metrics::counter!("cleaning_vehicles_registered_total").increment(1);
                    self.bus.publish(
                        FleetChange::VehicleRegistered { vehicle_id },
                        self.pool.snapshot(),
                    );
                    continue;
                }
                warn!(%vehicle_id, "Fleet filled up during registration, waiting for a release");
            }

            debug!(aircraft_id, "No vehicle available, waiting");
            let _ = tokio::time::timeout(self.timings.admission_recheck, notified).await;
        }
    }

    async fn travel(&self, lease: &mut VehicleLease, from: &str, to: &str) -> Result<(), TripError> {
        let route = self
            .coordinator
            .get_route(from, to, &self.vehicle_type)
            .await
            .map_err(|source| TripError::Routing {
                from: from.to_string(),
                to: to.to_string(),
                source,
            })?;

        if route.len() < 2 {
            return Err(TripError::Routing {
                from: from.to_string(),
                to: to.to_string(),
                source: CoordinatorError::InvalidRoute(route.len()),
            });
        }

        for edge in route.windows(2) {
            let (edge_from, edge_to) = (&edge[0], &edge[1]);
            let distance = self.request_move(lease.vehicle_id(), edge_from, edge_to).await?;

            let speed = self.settings.current().movement_speed;
            let hold = travel_time(distance, speed, self.timings.travel_time_unit);
            debug!(vehicle_id = %lease.vehicle_id(), edge_from, edge_to, distance, ?hold, "Moving");
            tokio::time::sleep(hold).await;

            let coordinator = &self.coordinator;
            let vehicle_id = lease.vehicle_id().clone();
            advisory(self.timings.notify_policy, "arrival", || {
                coordinator.notify_arrival(&vehicle_id, &self.vehicle_type, edge_to)
            })
            .await;

            lease.moved_to(edge_to);
        }
        Ok(())
    }

    /// Asks for the edge until granted, failing after the configured number
    /// of conflicts.
    async fn request_move(&self, vehicle_id: &VehicleId, from: &str, to: &str) -> Result<f64, TripError> {
        let attempts = self.settings.current().conflict_retry_count.max(1);

        for attempt in 1..=attempts {
            match self
                .coordinator
                .request_move(vehicle_id, &self.vehicle_type, from, to)
                .await
            {
                Ok(MoveOutcome::Granted { distance }) => return Ok(distance),
                Ok(MoveOutcome::Conflict) => {
                    metrics::counter!("cleaning_move_conflicts_total").increment(1);
                    warn!(%vehicle_id, from, to, attempt, max_attempts = attempts, "Movement conflict");
                    if attempt < attempts {
                        tokio::time::sleep(self.timings.conflict_retry_interval).await;
                    }
                }
                Err(source) => {
                    return Err(TripError::Movement {
                        from: from.to_string(),
                        to: to.to_string(),
                        source,
                    })
                }
            }
        }

        Err(TripError::ConflictExhausted {
            from: from.to_string(),
            to: to.to_string(),
            attempts,
        })
    }
}

/// Exclusive use of one acquired vehicle. Dropping an unreleased lease
/// puts the vehicle back at its last known node.
struct VehicleLease {
    pool: Arc<VehiclePool>,
    bus: FleetStatusBus,
    vehicle_id: VehicleId,
    last_node: String,
    released: bool,
}

impl VehicleLease {
    fn new(pool: Arc<VehiclePool>, bus: FleetStatusBus, vehicle: &AcquiredVehicle) -> Self {
        Self {
            pool,
            bus,
            vehicle_id: vehicle.id.clone(),
            last_node: vehicle.home_node.clone(),
            released: false,
        }
    }

    fn vehicle_id(&self) -> &VehicleId {
        &self.vehicle_id
    }

    fn moved_to(&mut self, node: &str) {
        self.pool.update_location(&self.vehicle_id, node);
        self.last_node = node.to_string();
        self.bus.publish(
            FleetChange::VehicleMoved {
                vehicle_id: self.vehicle_id.clone(),
                node: node.to_string(),
            },
            self.pool.snapshot(),
        );
    }

    fn release(mut self, home_node: &str) {
        self.pool.mark_available(&self.vehicle_id, home_node);
        self.released = true;
        self.bus.publish(
            FleetChange::VehicleReleased {
                vehicle_id: self.vehicle_id.clone(),
            },
            self.pool.snapshot(),
        );
    }
}

impl Drop for VehicleLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(vehicle_id = %self.vehicle_id, node = %self.last_node, "Recovering vehicle from failed trip");
        self.pool.mark_available(&self.vehicle_id, &self.last_node);
        self.bus.publish(
            FleetChange::VehicleRecovered {
                vehicle_id: self.vehicle_id.clone(),
                node: self.last_node.clone(),
            },
            self.pool.snapshot(),
        );
    }
}
