// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use cleaning_dispatch_core::application::dispatcher::{CleaningService, DispatchError, Dispatcher};
use cleaning_dispatch_core::application::flight_counter::FlightCounter;
use cleaning_dispatch_core::application::settings::{DispatchSettings, SettingsStore};
use cleaning_dispatch_core::application::trip_runner::{DispatchTimings, TripOrder, TripRunner};
use cleaning_dispatch_core::application::vehicle_pool::VehiclePool;
use cleaning_dispatch_core::domain::cleaning::{CleaningRequest, ValidationError};
use cleaning_dispatch_core::domain::coordinator::{
    CoordinatorError, CoordinatorMode, GroundCoordinator, MoveOutcome,
};
use cleaning_dispatch_core::domain::events::{FleetChange, FleetSnapshot};
use cleaning_dispatch_core::domain::service_config::DispatchConfig;
use cleaning_dispatch_core::domain::trip::TripError;
use cleaning_dispatch_core::domain::vehicle::{VehicleDescriptor, VehicleId, VehicleStatus};
use cleaning_dispatch_core::infrastructure::event_bus::{EventBusError, FleetStatusBus, FleetStatusReceiver};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// In-memory ground control with call counters and scripted failures.
#[derive(Default)]
struct ScriptedCoordinator {
    registrations: AtomicUsize,
    route_calls: AtomicUsize,
    move_calls: AtomicUsize,
    arrivals: AtomicUsize,
    /// The next N move requests answer Conflict
    pending_conflicts: AtomicUsize,
    always_conflict: AtomicBool,
    fail_routes: AtomicBool,
    /// Routes come back with only the destination node
    short_routes: AtomicBool,
    /// Every start/finish/arrival notification fails with a network error
    fail_notifications: AtomicBool,
    /// Zero-based registration call that fails
    fail_registration_at: Option<usize>,
    route_hold: Duration,
    starts: Mutex<Vec<String>>,
    finishes: Mutex<Vec<(String, u64)>>,
}

impl ScriptedCoordinator {
    fn with_route_hold(hold: Duration) -> Self {
        Self {
            route_hold: hold,
            ..Default::default()
        }
    }

    fn notification_outcome(&self) -> Result<(), CoordinatorError> {
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(CoordinatorError::Network("orchestrator unreachable".to_string()));
        }
        Ok(())
    }

    fn total_calls(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
            + self.route_calls.load(Ordering::SeqCst)
            + self.move_calls.load(Ordering::SeqCst)
            + self.arrivals.load(Ordering::SeqCst)
            + self.starts.lock().len()
            + self.finishes.lock().len()
    }
}

#[async_trait]
impl GroundCoordinator for ScriptedCoordinator {
    async fn register_vehicle(&self, vehicle_type: &str) -> Result<VehicleDescriptor, CoordinatorError> {
        let n = self.registrations.fetch_add(1, Ordering::SeqCst);
        if self.fail_registration_at == Some(n) {
            return Err(CoordinatorError::Network("ground control down".to_string()));
        }
        Ok(VehicleDescriptor {
            id: VehicleId::new(format!("{}_{}", vehicle_type, n)),
            home_node: "garage".to_string(),
            service_spots: HashMap::new(),
        })
    }

    async fn get_route(&self, from: &str, to: &str, _vehicle_type: &str) -> Result<Vec<String>, CoordinatorError> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_routes.load(Ordering::SeqCst) {
            return Err(CoordinatorError::Http {
                status: 503,
                body: "routing offline".to_string(),
            });
        }
        if !self.route_hold.is_zero() {
            tokio::time::sleep(self.route_hold).await;
        }
        if self.short_routes.load(Ordering::SeqCst) {
            return Ok(vec![to.to_string()]);
        }
        Ok(vec![from.to_string(), "taxiway".to_string(), to.to_string()])
    }

    async fn request_move(
        &self,
        _vehicle_id: &VehicleId,
        _vehicle_type: &str,
        _from: &str,
        _to: &str,
    ) -> Result<MoveOutcome, CoordinatorError> {
        self.move_calls.fetch_add(1, Ordering::SeqCst);
        if self.always_conflict.load(Ordering::SeqCst) {
            return Ok(MoveOutcome::Conflict);
        }
        let scripted = self
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted {
            return Ok(MoveOutcome::Conflict);
        }
        Ok(MoveOutcome::Granted { distance: 10.0 })
    }

    async fn notify_arrival(&self, _vehicle_id: &VehicleId, _vehicle_type: &str, _node: &str) -> Result<(), CoordinatorError> {
        self.arrivals.fetch_add(1, Ordering::SeqCst);
        self.notification_outcome()
    }

    async fn notify_cleaning_start(&self, aircraft_id: &str) -> Result<(), CoordinatorError> {
        self.starts.lock().push(aircraft_id.to_string());
        self.notification_outcome()
    }

    async fn notify_cleaning_finish(&self, aircraft_id: &str, water_amount: u64) -> Result<(), CoordinatorError> {
        self.finishes.lock().push((aircraft_id.to_string(), water_amount));
        self.notification_outcome()
    }

    fn mode(&self) -> CoordinatorMode {
        CoordinatorMode::Simulated
    }
}

fn fast_config() -> DispatchConfig {
    DispatchConfig {
        conflict_retry_interval_ms: 0,
        notify_retry_backoff_ms: 0,
        admission_recheck_ms: 10,
        service_duration_ms: 0,
        travel_time_unit_ms: 0,
        status_channel_capacity: 8192,
        ..Default::default()
    }
}

fn dispatcher(coordinator: Arc<ScriptedCoordinator>, config: &DispatchConfig) -> Dispatcher {
    Dispatcher::new(coordinator, config, "cleaning")
}

fn drain(receiver: &mut FleetStatusReceiver) -> Vec<FleetSnapshot> {
    let mut snapshots = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(EventBusError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    snapshots
}

fn dispatched_count(snapshots: &[FleetSnapshot]) -> usize {
    snapshots
        .iter()
        .filter(|s| matches!(s.change, FleetChange::VehicleDispatched { .. }))
        .count()
}

const DEADLINE: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_request_split_into_capacity_loads() {
    let coordinator = Arc::new(ScriptedCoordinator::default());
    let dispatcher = dispatcher(coordinator.clone(), &fast_config());
    let mut receiver = dispatcher.subscribe();

    let response = timeout(
        DEADLINE,
        dispatcher.request_cleaning(CleaningRequest::new("A320-1", "parking_1", 250)),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(response.wait);

    // Three trips, each routed out and back over two edges
    let snapshots = drain(&mut receiver);
    assert_eq!(dispatched_count(&snapshots), 3);
    assert_eq!(coordinator.route_calls.load(Ordering::SeqCst), 6);
    assert_eq!(coordinator.move_calls.load(Ordering::SeqCst), 12);
    assert_eq!(coordinator.arrivals.load(Ordering::SeqCst), 12);

    assert_eq!(*coordinator.starts.lock(), vec!["A320-1".to_string()]);
    assert_eq!(*coordinator.finishes.lock(), vec![("A320-1".to_string(), 250)]);

    let fleet = dispatcher.fleet();
    assert!(!fleet.is_empty() && fleet.len() <= 2);
    for vehicle in &fleet {
        assert_eq!(vehicle.status, VehicleStatus::Available);
        assert_eq!(vehicle.current_node, "garage");
    }
    assert_eq!(dispatcher.flights().active_flights(), 0);
}

#[tokio::test]
async fn test_negative_water_rejected_without_side_effects() {
    let coordinator = Arc::new(ScriptedCoordinator::default());
    let dispatcher = dispatcher(coordinator.clone(), &fast_config());

    let err = dispatcher
        .request_cleaning(CleaningRequest::new("A320-1", "parking_1", -5))
        .await
        .unwrap_err();

    match err {
        DispatchError::Validation(e) => {
            assert_eq!(e, ValidationError::NegativeWaterAmount(-5));
            assert_eq!(e.error_code(), 101);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(coordinator.total_calls(), 0);
    assert!(dispatcher.fleet().is_empty());
}

#[tokio::test]
async fn test_missing_identifier_rejected_without_coordinator_calls() {
    let coordinator = Arc::new(ScriptedCoordinator::default());
    let dispatcher = dispatcher(coordinator.clone(), &fast_config());

    for request in [
        CleaningRequest::new("", "parking_1", 100),
        CleaningRequest::new("A320-1", "", 100),
    ] {
        let err = dispatcher.request_cleaning(request).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Validation(ValidationError::MissingIdentifier)
        ));
    }
    assert_eq!(coordinator.total_calls(), 0);
}

#[tokio::test]
async fn test_zero_water_completes_without_trips() {
    let coordinator = Arc::new(ScriptedCoordinator::default());
    let dispatcher = dispatcher(coordinator.clone(), &fast_config());

    let response = dispatcher
        .request_cleaning(CleaningRequest::new("A320-1", "parking_1", 0))
        .await
        .unwrap();

    assert!(response.wait);
    assert_eq!(coordinator.registrations.load(Ordering::SeqCst), 0);
    assert_eq!(coordinator.route_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_saturated_fleet_waits_for_release() {
    let coordinator = Arc::new(ScriptedCoordinator::with_route_hold(Duration::from_millis(20)));
    let config = DispatchConfig {
        max_vehicles_total: 1,
        ..fast_config()
    };
    let dispatcher = dispatcher(coordinator.clone(), &config);
    let mut receiver = dispatcher.subscribe();

    let first = dispatcher.request_cleaning(CleaningRequest::new("A320-1", "parking_1", 100));
    let second = dispatcher.request_cleaning(CleaningRequest::new("B737-2", "parking_2", 100));
    let (first, second) = timeout(DEADLINE, async { tokio::join!(first, second) })
        .await
        .unwrap();

    assert!(first.unwrap().wait);
    assert!(second.unwrap().wait);
    assert_eq!(coordinator.registrations.load(Ordering::SeqCst), 1);

    let snapshots = drain(&mut receiver);
    assert_eq!(dispatched_count(&snapshots), 2);
    assert!(snapshots.iter().all(|s| s.busy_count() <= 1));
    assert!(snapshots.iter().all(|s| s.vehicles.len() <= 1));
}

#[tokio::test]
async fn test_fleet_cap_holds_under_concurrent_requests() {
    let coordinator = Arc::new(ScriptedCoordinator::with_route_hold(Duration::from_millis(5)));
    let config = DispatchConfig {
        max_vehicles_total: 3,
        ..fast_config()
    };
    let dispatcher = dispatcher(coordinator.clone(), &config);
    let mut receiver = dispatcher.subscribe();

    let requests = (0..6).map(|i| {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            dispatcher
                .request_cleaning(CleaningRequest::new(format!("flight-{i}"), "parking_1", 200))
                .await
        })
    });
    let results = timeout(DEADLINE, futures::future::join_all(requests))
        .await
        .unwrap();

    for result in results {
        assert!(result.unwrap().unwrap().wait);
    }
    assert!(coordinator.registrations.load(Ordering::SeqCst) <= 3);
    assert!(dispatcher.fleet().len() <= 3);

    let snapshots = drain(&mut receiver);
    assert_eq!(dispatched_count(&snapshots), 12);
    assert!(snapshots.iter().all(|s| s.vehicles.len() <= 3));
    assert!(snapshots.iter().all(|s| s.busy_count() <= 3));
    assert_eq!(coordinator.finishes.lock().len(), 6);
}

#[tokio::test]
async fn test_per_flight_limit_bounds_busy_vehicles() {
    let coordinator = Arc::new(ScriptedCoordinator::with_route_hold(Duration::from_millis(5)));
    let dispatcher = dispatcher(coordinator.clone(), &fast_config());
    let mut receiver = dispatcher.subscribe();

    // Two requests for the same aircraft compete for the same two slots
    let first = dispatcher.request_cleaning(CleaningRequest::new("A380-9", "parking_1", 400));
    let second = dispatcher.request_cleaning(CleaningRequest::new("A380-9", "parking_1", 300));
    let (first, second) = timeout(DEADLINE, async { tokio::join!(first, second) })
        .await
        .unwrap();
    first.unwrap();
    second.unwrap();

    let snapshots = drain(&mut receiver);
    assert_eq!(dispatched_count(&snapshots), 7);
    assert!(snapshots.iter().all(|s| s.busy_count() <= 2));
    assert_eq!(dispatcher.flights().current("A380-9"), 0);
}

fn assert_fleet_idle(dispatcher: &Dispatcher) {
    for vehicle in dispatcher.fleet() {
        assert_eq!(vehicle.status, VehicleStatus::Available, "{}", vehicle.vehicle_id);
        assert_eq!(vehicle.current_node, "garage");
    }
    assert_eq!(dispatcher.flights().active_flights(), 0);
}

#[tokio::test]
async fn test_route_failure_abandons_trip_not_request() {
    let coordinator = Arc::new(ScriptedCoordinator::default());
    coordinator.fail_routes.store(true, Ordering::SeqCst);
    let dispatcher = dispatcher(coordinator.clone(), &fast_config());
    let mut receiver = dispatcher.subscribe();

    let response = timeout(
        DEADLINE,
        dispatcher.request_cleaning(CleaningRequest::new("A320-1", "parking_1", 100)),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(response.wait);

    assert_eq!(dispatcher.fleet().len(), 1);
    assert_fleet_idle(&dispatcher);
    assert_eq!(*coordinator.finishes.lock(), vec![("A320-1".to_string(), 100)]);

    let snapshots = drain(&mut receiver);
    assert!(snapshots
        .iter()
        .any(|s| matches!(s.change, FleetChange::VehicleRecovered { .. })));
}

#[tokio::test]
async fn test_short_route_abandons_trip() {
    let coordinator = Arc::new(ScriptedCoordinator::default());
    coordinator.short_routes.store(true, Ordering::SeqCst);
    let dispatcher = dispatcher(coordinator.clone(), &fast_config());

    let response = timeout(
        DEADLINE,
        dispatcher.request_cleaning(CleaningRequest::new("A320-1", "parking_1", 250)),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(response.wait);

    // Every trip stops at the outbound route; nothing ever moves
    assert_eq!(coordinator.route_calls.load(Ordering::SeqCst), 3);
    assert_eq!(coordinator.move_calls.load(Ordering::SeqCst), 0);
    assert_fleet_idle(&dispatcher);
    assert_eq!(coordinator.finishes.lock().len(), 1);
}

#[tokio::test]
async fn test_conflict_exhaustion_abandons_trip() {
    let coordinator = Arc::new(ScriptedCoordinator::default());
    coordinator.always_conflict.store(true, Ordering::SeqCst);
    let config = DispatchConfig {
        conflict_retry_bound: 3,
        ..fast_config()
    };
    let dispatcher = dispatcher(coordinator.clone(), &config);
    let mut receiver = dispatcher.subscribe();

    timeout(
        DEADLINE,
        dispatcher.request_cleaning(CleaningRequest::new("A320-1", "parking_1", 100)),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(coordinator.move_calls.load(Ordering::SeqCst), 3);
    assert_fleet_idle(&dispatcher);
    assert!(drain(&mut receiver)
        .iter()
        .any(|s| matches!(s.change, FleetChange::VehicleRecovered { .. })));
}

#[tokio::test]
async fn test_registration_failure_abandons_only_that_trip() {
    let coordinator = Arc::new(ScriptedCoordinator {
        fail_registration_at: Some(0),
        ..Default::default()
    });
    let dispatcher = dispatcher(coordinator.clone(), &fast_config());

    let response = timeout(
        DEADLINE,
        dispatcher.request_cleaning(CleaningRequest::new("A1", "p1", 300)),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(response.wait);

    // The request ran to the end: both batches dispatched and finish announced
    assert!(coordinator.registrations.load(Ordering::SeqCst) >= 2);
    assert!(coordinator.route_calls.load(Ordering::SeqCst) >= 4);
    assert_eq!(*coordinator.finishes.lock(), vec![("A1".to_string(), 300)]);
    assert!(!dispatcher.fleet().is_empty());
    assert_fleet_idle(&dispatcher);
}

#[tokio::test]
async fn test_failed_notifications_do_not_fail_request() {
    let coordinator = Arc::new(ScriptedCoordinator::default());
    coordinator.fail_notifications.store(true, Ordering::SeqCst);
    let config = DispatchConfig {
        notify_retry_attempts: 3,
        ..fast_config()
    };
    let dispatcher = dispatcher(coordinator.clone(), &config);

    let response = timeout(
        DEADLINE,
        dispatcher.request_cleaning(CleaningRequest::new("A320-1", "parking_1", 100)),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(response.wait);

    // Each notification was attempted the full number of times
    assert_eq!(coordinator.starts.lock().len(), 3);
    assert_eq!(coordinator.finishes.lock().len(), 3);
    assert_eq!(coordinator.arrivals.load(Ordering::SeqCst), 4 * 3);
    assert_eq!(dispatcher.fleet().len(), 1);
    assert_fleet_idle(&dispatcher);
}

fn runner(coordinator: Arc<ScriptedCoordinator>, config: &DispatchConfig) -> (TripRunner, Arc<VehiclePool>, Arc<FlightCounter>) {
    let pool = Arc::new(VehiclePool::new(config.max_vehicles_total));
    let runner = TripRunner::new(
        pool.clone(),
        coordinator,
        FleetStatusBus::new(config.status_channel_capacity),
        Arc::new(SettingsStore::new(DispatchSettings::from(config))),
        DispatchTimings::from(config),
        "cleaning",
    );
    (runner, pool, Arc::new(FlightCounter::new()))
}

fn order(water: u64) -> TripOrder {
    TripOrder {
        aircraft_id: "A320-1".to_string(),
        node_id: "parking_1".to_string(),
        water,
    }
}

#[tokio::test]
async fn test_trip_errors_by_failure_kind() {
    let config = DispatchConfig {
        conflict_retry_bound: 2,
        ..fast_config()
    };

    let coordinator = Arc::new(ScriptedCoordinator {
        fail_registration_at: Some(0),
        ..Default::default()
    });
    let (trip, pool, flights) = runner(coordinator, &config);
    let slot = flights.try_admit("A320-1", 2).unwrap();
    let err = trip.run(order(100), slot).await.unwrap_err();
    assert!(matches!(err, TripError::Registration(CoordinatorError::Network(_))));
    assert!(pool.is_empty());
    assert_eq!(flights.active_flights(), 0);

    let coordinator = Arc::new(ScriptedCoordinator::default());
    coordinator.short_routes.store(true, Ordering::SeqCst);
    let (trip, pool, flights) = runner(coordinator, &config);
    let slot = flights.try_admit("A320-1", 2).unwrap();
    let err = trip.run(order(100), slot).await.unwrap_err();
    assert!(matches!(
        err,
        TripError::Routing { source: CoordinatorError::InvalidRoute(1), .. }
    ));
    assert_eq!(pool.busy_count(), 0);
    assert_eq!(flights.active_flights(), 0);

    let coordinator = Arc::new(ScriptedCoordinator::default());
    coordinator.always_conflict.store(true, Ordering::SeqCst);
    let (trip, pool, flights) = runner(coordinator, &config);
    let slot = flights.try_admit("A320-1", 2).unwrap();
    let err = trip.run(order(100), slot).await.unwrap_err();
    assert!(matches!(err, TripError::ConflictExhausted { attempts: 2, .. }));
    assert!(!err.is_internal());
    assert_eq!(pool.busy_count(), 0);
    assert_eq!(flights.active_flights(), 0);
}

#[tokio::test]
async fn test_transient_conflicts_are_retried() {
    let coordinator = Arc::new(ScriptedCoordinator::default());
    coordinator.pending_conflicts.store(2, Ordering::SeqCst);
    let dispatcher = dispatcher(coordinator.clone(), &fast_config());

    timeout(
        DEADLINE,
        dispatcher.request_cleaning(CleaningRequest::new("A320-1", "parking_1", 50)),
    )
    .await
    .unwrap()
    .unwrap();

    // Four granted edges plus the two conflicts
    assert_eq!(coordinator.move_calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_capacity_change_applies_to_next_request() {
    let coordinator = Arc::new(ScriptedCoordinator::default());
    let dispatcher = dispatcher(coordinator.clone(), &fast_config());
    let mut receiver = dispatcher.subscribe();

    assert_eq!(dispatcher.set_capacity(50).unwrap(), 50);
    dispatcher
        .request_cleaning(CleaningRequest::new("A320-1", "parking_1", 150))
        .await
        .unwrap();

    assert_eq!(dispatched_count(&drain(&mut receiver)), 3);
    assert!(dispatcher.set_capacity(0).is_err());
    assert_eq!(dispatcher.settings().vehicle_capacity, 50);
}

#[tokio::test]
async fn test_bulk_registration_respects_fleet_cap() {
    let coordinator = Arc::new(ScriptedCoordinator::default());
    let config = DispatchConfig {
        max_vehicles_total: 3,
        ..fast_config()
    };
    let dispatcher = dispatcher(coordinator.clone(), &config);

    assert_eq!(dispatcher.register_vehicles("cleaning").await.unwrap(), 3);
    assert_eq!(dispatcher.fleet().len(), 3);
    assert_eq!(dispatcher.register_vehicles("cleaning").await.unwrap(), 0);
    assert_eq!(coordinator.registrations.load(Ordering::SeqCst), 3);

    assert!(matches!(
        dispatcher.register_vehicles("  ").await,
        Err(DispatchError::InvalidVehicleType)
    ));
}

#[tokio::test]
async fn test_reload_clears_pool_and_counters() {
    let coordinator = Arc::new(ScriptedCoordinator::default());
    let dispatcher = dispatcher(coordinator.clone(), &fast_config());

    dispatcher
        .request_cleaning(CleaningRequest::new("A320-1", "parking_1", 200))
        .await
        .unwrap();
    assert!(!dispatcher.fleet().is_empty());

    let mut receiver = dispatcher.subscribe();
    dispatcher.reload().await;

    assert!(dispatcher.fleet().is_empty());
    assert_eq!(dispatcher.flights().active_flights(), 0);
    let snapshots = drain(&mut receiver);
    assert!(matches!(snapshots.last().map(|s| &s.change), Some(FleetChange::FleetReset)));

    // The service keeps working afterwards and registers afresh
    dispatcher
        .request_cleaning(CleaningRequest::new("A320-1", "parking_1", 100))
        .await
        .unwrap();
    assert_eq!(dispatcher.fleet().len(), 1);
}
