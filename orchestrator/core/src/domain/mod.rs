// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Vehicles, cleaning requests, trips and the coordinator contract.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and interfaces shared by every other layer

pub mod cleaning;
pub mod coordinator;
pub mod events;
pub mod service_config;
pub mod trip;
pub mod vehicle;
