// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! Dispatch use cases built on the domain types.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Vehicle pool, flight limits, trips and request orchestration

pub mod dispatcher;
pub mod flight_counter;
pub mod retry;
pub mod settings;
pub mod trip_runner;
pub mod vehicle_pool;
