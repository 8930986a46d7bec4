//! Bounded exponential backoff for favorite sync
//!
//! Used when the host has no background sync primitive to re-fire the
//! sync event for us.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1_000,
            multiplier: 2.0,
            max_delay_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    /// Policy that never waits, for tests and one-shot runs
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            multiplier: 1.0,
            max_delay_ms: 0,
        }
    }

    /// Delay before retry number `retry` (1-based), capped at `max_delay_ms`
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.initial_delay_ms as f64 * self.multiplier.max(1.0).powi(exp);
        Duration::from_millis(millis.min(self.max_delay_ms as f64) as u64)
    }
}
