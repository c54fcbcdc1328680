// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Bounded retry helpers for coordinator calls.
//
// Advisory calls (start/finish/arrival notifications) are retried a few
// times with a fixed backoff and then dropped with a warning: the dispatch
// outcome never depends on them.

use crate::domain::coordinator::CoordinatorError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed-interval retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }
}

/// Runs `op` under `policy`. Returns true if one attempt succeeded.
///
/// Non-transient errors stop retrying immediately.
pub async fn advisory<F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), CoordinatorError>>,
{
    for attempt in 1..=policy.attempts {
        match op().await {
            Ok(()) => {
                debug!(what, attempt, "Advisory call delivered");
                return true;
            }
            Err(e) if e.is_transient() && attempt < policy.attempts => {
                warn!(what, attempt, max_attempts = policy.attempts, error = %e, "Advisory call failed, retrying");
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => {
                warn!(what, attempt, error = %e, "Advisory call dropped");
                return false;
            }
        }
    }
    false
}
