// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure
//!
//! Adapters to the outside world: coordinator backends and the status bus.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** HTTP clients, simulated backends and broadcast plumbing

pub mod coordinator;
pub mod event_bus;
