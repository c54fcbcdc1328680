// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration Types
//
// Defines the configuration schema for a cleaning dispatch node:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - HTTP bind settings
// - Coordinator backend selection (simulated or live) and endpoints
// - Dispatch limits, retry bounds and simulated timings
// - Observability settings

use crate::domain::coordinator::CoordinatorMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "cleaning-dispatch/v1";
pub const KIND: &str = "ServiceConfig";
pub const CONFIG_PATH_ENV: &str = "CLEANING_DISPATCH_CONFIG";

/// Top-level Kubernetes-style service configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigManifest {
    /// API version (must be "cleaning-dispatch/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ServiceConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: ServiceConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable instance name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Content under spec:
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfigSpec {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Backend used for ground control and orchestrator calls
    #[serde(default)]
    pub mode: CoordinatorMode,

    /// Ground control base URL (vehicle registration, routing, movement)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ground_control_url: Option<String>,

    /// Flight orchestrator base URL (cleaning start/finish notifications)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orchestrator_url: Option<String>,

    /// Per-call HTTP timeout for the live backend
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Vehicle type announced to ground control
    #[serde(default = "default_vehicle_type")]
    pub vehicle_type: String,

    #[serde(default)]
    pub simulated: SimulatedCoordinatorConfig,
}

/// Canned behaviour of the simulated backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedCoordinatorConfig {
    #[serde(default = "default_register_delay_ms")]
    pub register_delay_ms: u64,

    #[serde(default = "default_route_delay_ms")]
    pub route_delay_ms: u64,

    #[serde(default = "default_route_delay_ms")]
    pub move_delay_ms: u64,

    #[serde(default = "default_notify_delay_ms")]
    pub notify_delay_ms: u64,

    /// Distance reported for every granted edge
    #[serde(default = "default_move_distance")]
    pub move_distance: f64,

    /// Garage node assigned to simulated vehicles
    #[serde(default = "default_garage_node")]
    pub garage_node: String,

    /// aircraft id -> service spot handed out with each simulated vehicle
    #[serde(default = "default_service_spots")]
    pub service_spots: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Water carried by one vehicle per trip
    #[serde(default = "default_vehicle_capacity")]
    pub vehicle_capacity: u64,

    /// Distance units per time unit
    #[serde(default = "default_movement_speed")]
    pub movement_speed: f64,

    /// Fleet-wide vehicle cap
    #[serde(default = "default_max_vehicles_total")]
    pub max_vehicles_total: usize,

    /// Concurrent vehicles allowed for one aircraft
    #[serde(default = "default_max_vehicles_per_flight")]
    pub max_vehicles_per_flight: usize,

    /// Movement attempts per edge before a trip fails
    #[serde(default = "default_conflict_retry_bound")]
    pub conflict_retry_bound: u32,

    #[serde(default = "default_conflict_retry_interval_ms")]
    pub conflict_retry_interval_ms: u64,

    /// Attempts for advisory notifications (start/finish/arrival)
    #[serde(default = "default_notify_retry_attempts")]
    pub notify_retry_attempts: u32,

    #[serde(default = "default_notify_retry_backoff_ms")]
    pub notify_retry_backoff_ms: u64,

    /// Fallback re-check interval for admission waits
    #[serde(default = "default_admission_recheck_ms")]
    pub admission_recheck_ms: u64,

    /// Time spent servicing the aircraft
    #[serde(default = "default_service_duration_ms")]
    pub service_duration_ms: u64,

    /// Wall-clock length of one travel time unit
    #[serde(default = "default_travel_time_unit_ms")]
    pub travel_time_unit_ms: u64,

    /// Vehicles registered by the bulk admin operation
    #[serde(default = "default_bulk_registration_count")]
    pub bulk_registration_count: usize,

    /// Buffered snapshots per status subscriber
    #[serde(default = "default_status_channel_capacity")]
    pub status_channel_capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus exposition
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics listener port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_vehicle_type() -> String {
    "cleaning".to_string()
}

fn default_register_delay_ms() -> u64 {
    200
}

fn default_route_delay_ms() -> u64 {
    100
}

fn default_notify_delay_ms() -> u64 {
    50
}

fn default_move_distance() -> f64 {
    50.0
}

fn default_garage_node() -> String {
    "garrage_cleaning_1".to_string()
}

fn default_service_spots() -> HashMap<String, String> {
    HashMap::from([
        ("parking_1".to_string(), "parking_1_cleaning_1".to_string()),
        ("parking_2".to_string(), "parking_2_cleaning_1".to_string()),
    ])
}

fn default_vehicle_capacity() -> u64 {
    100
}

fn default_movement_speed() -> f64 {
    10.0
}

fn default_max_vehicles_total() -> usize {
    5
}

fn default_max_vehicles_per_flight() -> usize {
    2
}

fn default_conflict_retry_bound() -> u32 {
    30
}

fn default_conflict_retry_interval_ms() -> u64 {
    2_000
}

fn default_notify_retry_attempts() -> u32 {
    3
}

fn default_notify_retry_backoff_ms() -> u64 {
    2_000
}

fn default_admission_recheck_ms() -> u64 {
    1_000
}

fn default_service_duration_ms() -> u64 {
    5_000
}

fn default_travel_time_unit_ms() -> u64 {
    1_000
}

fn default_bulk_registration_count() -> usize {
    5
}

fn default_status_channel_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9091
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            mode: CoordinatorMode::default(),
            ground_control_url: None,
            orchestrator_url: None,
            request_timeout_ms: default_request_timeout_ms(),
            vehicle_type: default_vehicle_type(),
            simulated: SimulatedCoordinatorConfig::default(),
        }
    }
}

impl Default for SimulatedCoordinatorConfig {
    fn default() -> Self {
        Self {
            register_delay_ms: default_register_delay_ms(),
            route_delay_ms: default_route_delay_ms(),
            move_delay_ms: default_route_delay_ms(),
            notify_delay_ms: default_notify_delay_ms(),
            move_distance: default_move_distance(),
            garage_node: default_garage_node(),
            service_spots: default_service_spots(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            vehicle_capacity: default_vehicle_capacity(),
            movement_speed: default_movement_speed(),
            max_vehicles_total: default_max_vehicles_total(),
            max_vehicles_per_flight: default_max_vehicles_per_flight(),
            conflict_retry_bound: default_conflict_retry_bound(),
            conflict_retry_interval_ms: default_conflict_retry_interval_ms(),
            notify_retry_attempts: default_notify_retry_attempts(),
            notify_retry_backoff_ms: default_notify_retry_backoff_ms(),
            admission_recheck_ms: default_admission_recheck_ms(),
            service_duration_ms: default_service_duration_ms(),
            travel_time_unit_ms: default_travel_time_unit_ms(),
            bulk_registration_count: default_bulk_registration_count(),
            status_channel_capacity: default_status_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServiceConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "cleaning-dispatch".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: ServiceConfigSpec::default(),
        }
    }
}

impl ServiceConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. CLEANING_DISPATCH_CONFIG environment variable
    /// 2. ./cleaning-dispatch.yaml (working directory)
    /// 3. ~/.cleaning-dispatch/config.yaml (user home)
    /// 4. /etc/cleaning-dispatch/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        Self::search_paths().into_iter().find(|p| p.exists())
    }

    /// Standard locations checked after the environment variable, in order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./cleaning-dispatch.yaml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".cleaning-dispatch").join("config.yaml"));
        }
        paths.push(PathBuf::from("/etc/cleaning-dispatch/config.yaml"));
        paths
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::warn!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CLEANING_DISPATCH_COORDINATOR_MODE") {
            match val.parse::<CoordinatorMode>() {
                Ok(mode) => {
                    tracing::info!("Environment override: CLEANING_DISPATCH_COORDINATOR_MODE={}", mode);
                    self.spec.coordinator.mode = mode;
                }
                Err(e) => {
                    tracing::warn!("Invalid value for CLEANING_DISPATCH_COORDINATOR_MODE: {}. Ignoring.", e);
                }
            }
        }

        if let Ok(url) = std::env::var("CLEANING_DISPATCH_GROUND_CONTROL_URL") {
            tracing::info!("Environment override: CLEANING_DISPATCH_GROUND_CONTROL_URL={}", url);
            self.spec.coordinator.ground_control_url = Some(url);
        }

        if let Ok(url) = std::env::var("CLEANING_DISPATCH_ORCHESTRATOR_URL") {
            tracing::info!("Environment override: CLEANING_DISPATCH_ORCHESTRATOR_URL={}", url);
            self.spec.coordinator.orchestrator_url = Some(url);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let dispatch = &self.spec.dispatch;
        if dispatch.vehicle_capacity == 0 {
            anyhow::bail!("spec.dispatch.vehicle_capacity must be greater than 0");
        }
        if !(dispatch.movement_speed.is_finite() && dispatch.movement_speed > 0.0) {
            anyhow::bail!("spec.dispatch.movement_speed must be a positive number");
        }
        if dispatch.max_vehicles_total == 0 {
            anyhow::bail!("spec.dispatch.max_vehicles_total must be greater than 0");
        }
        if dispatch.max_vehicles_per_flight == 0 {
            anyhow::bail!("spec.dispatch.max_vehicles_per_flight must be greater than 0");
        }
        if dispatch.conflict_retry_bound == 0 {
            anyhow::bail!("spec.dispatch.conflict_retry_bound must be greater than 0");
        }
        if dispatch.status_channel_capacity == 0 {
            anyhow::bail!("spec.dispatch.status_channel_capacity must be greater than 0");
        }

        let coordinator = &self.spec.coordinator;
        if coordinator.vehicle_type.is_empty() {
            anyhow::bail!("spec.coordinator.vehicle_type cannot be empty");
        }
        if coordinator.mode == CoordinatorMode::Live {
            if coordinator.ground_control_url.as_deref().unwrap_or("").is_empty() {
                anyhow::bail!("spec.coordinator.ground_control_url is required in live mode");
            }
            if coordinator.orchestrator_url.as_deref().unwrap_or("").is_empty() {
                anyhow::bail!("spec.coordinator.orchestrator_url is required in live mode");
            }
        }

        if let Some(logging) = self.spec.observability.as_ref().and_then(|o| o.logging.as_ref()) {
            if !matches!(logging.format.as_str(), "text" | "json") {
                anyhow::bail!("Invalid log format '{}'. Must be 'text' or 'json'", logging.format);
            }
        }

        Ok(())
    }
}
