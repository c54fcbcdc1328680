// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Fleet Status Bus - Pub/Sub for pool snapshots
//
// Fans out full-pool snapshots over a tokio broadcast channel to SSE clients
// and any in-process observer. Every message is a complete state, so a
// lagging subscriber just skips ahead.

use crate::domain::events::{FleetChange, FleetSnapshot};
use crate::domain::vehicle::VehicleStatusView;
use futures::Stream;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct FleetStatusBus {
    sender: Arc<broadcast::Sender<FleetSnapshot>>,
}

impl FleetStatusBus {
    /// Capacity is the number of snapshots buffered per subscriber before
    /// the oldest are dropped.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(256)
    }

    /// Publish a snapshot of `vehicles` caused by `change`. Never blocks.
    pub fn publish(&self, change: FleetChange, vehicles: Vec<VehicleStatusView>) {
        let snapshot = FleetSnapshot::new(change, vehicles);
        metrics::gauge!("cleaning_fleet_busy_vehicles").set(snapshot.busy_count() as f64);
        debug!(change = ?snapshot.change, vehicles = snapshot.vehicles.len(), "Publishing fleet snapshot");

        // send() only fails when nobody is listening
        if self.sender.send(snapshot).is_err() {
            debug!("No subscribers listening to fleet status");
        }
    }

    pub fn subscribe(&self) -> FleetStatusReceiver {
        FleetStatusReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for FleetStatusBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

pub struct FleetStatusReceiver {
    receiver: broadcast::Receiver<FleetSnapshot>,
}

impl FleetStatusReceiver {
    pub async fn recv(&mut self) -> Result<FleetSnapshot, EventBusError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => EventBusError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!("Fleet status receiver lagged by {} snapshots", n);
                EventBusError::Lagged(n)
            }
        })
    }

    pub fn try_recv(&mut self) -> Result<FleetSnapshot, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Fleet status receiver lagged by {} snapshots", n);
                EventBusError::Lagged(n)
            }
        })
    }

    /// Stream of snapshots; lag gaps are skipped silently.
    pub fn into_stream(self) -> impl Stream<Item = FleetSnapshot> + Send + 'static {
        BroadcastStream::new(self.receiver).filter_map(|item| match item {
            Ok(snapshot) => Some(snapshot),
            Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
                warn!("Fleet status stream lagged by {} snapshots", n);
                None
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Fleet status bus is closed")]
    Closed,

    #[error("No snapshots available")]
    Empty,

    #[error("Receiver lagged by {0} snapshots (snapshots were dropped)")]
    Lagged(u64),
}
