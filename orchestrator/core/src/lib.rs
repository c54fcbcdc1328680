// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cleaning Dispatch Core
//!
//! Dispatches a bounded fleet of water-cleaning vehicles to parked aircraft.
//! A request for N units of water is split into vehicle loads, driven edge by
//! edge through a ground-control coordinator, and answered once every load
//! has been delivered and every vehicle is back home.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, dispatch engine, coordinator adapters and HTTP API
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`domain`] | Vehicles, requests, trips, the coordinator contract, configuration |
//! | [`application`] | Vehicle pool, flight counters, trip runner, dispatcher |
//! | [`infrastructure`] | Live and simulated coordinators, fleet status bus |
//! | [`presentation`] | axum router |

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
