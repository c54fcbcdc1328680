// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Service HTTP server implementation

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use cleaning_dispatch_core::{
    application::dispatcher::Dispatcher,
    domain::{coordinator::CoordinatorMode, service_config::ServiceConfigManifest},
    infrastructure::coordinator::build_coordinator,
    presentation::api,
};

/// Command-line overrides applied on top of the loaded manifest.
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub mode: Option<CoordinatorMode>,
}

impl ServeOptions {
    pub fn apply(&self, manifest: &mut ServiceConfigManifest) {
        if let Some(host) = &self.host {
            manifest.spec.network.bind_address = host.clone();
        }
        if let Some(port) = self.port {
            manifest.spec.network.port = port;
        }
        if let Some(mode) = self.mode {
            manifest.spec.coordinator.mode = mode;
        }
    }
}

pub async fn start_server(mut manifest: ServiceConfigManifest, options: ServeOptions) -> Result<()> {
    options.apply(&mut manifest);
    manifest.validate().context("Configuration validation failed")?;

    let spec = &manifest.spec;
    info!(
        name = %manifest.metadata.name,
        coordinator_mode = %spec.coordinator.mode,
        max_vehicles = spec.dispatch.max_vehicles_total,
        vehicle_capacity = spec.dispatch.vehicle_capacity,
        "Cleaning dispatch starting"
    );

    if let Some(metrics) = spec.observability.as_ref().and_then(|o| o.metrics.as_ref()) {
        if metrics.enabled {
            let addr = SocketAddr::from(([0, 0, 0, 0], metrics.port));
            match PrometheusBuilder::new().with_http_listener(addr).install() {
                Ok(()) => info!("Prometheus metrics exposed on {}", addr),
                Err(e) => warn!("Failed to install Prometheus exporter: {}", e),
            }
        }
    }

    let coordinator = build_coordinator(&spec.coordinator).context("Failed to build ground coordinator")?;
    let dispatcher = Dispatcher::new(coordinator, &spec.dispatch, spec.coordinator.vehicle_type.clone());
    let app = api::app(Arc::new(dispatcher));

    let addr = format!("{}:{}", spec.network.bind_address, spec.network.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Cleaning dispatch shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
