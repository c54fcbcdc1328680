// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Service mode implementation
//!
//! Handles:
//! - Configuration overrides from the command line
//! - Coordinator and dispatcher wiring
//! - Prometheus exposition
//! - Graceful shutdown

pub mod server;

pub use server::{start_server, ServeOptions};
