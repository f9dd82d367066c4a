//! RateGovernor: sliding-window admission control for outbound model calls.
//!
//! At most `max_requests` calls are admitted inside any trailing `window_ms`
//! interval. A caller that finds the window full sleeps until the oldest
//! admission leaves the window (plus a small buffer), then re-evaluates the
//! window from scratch: other callers may have been admitted meanwhile.
//!
//! Admission order among suspended callers is not FIFO. Whoever takes the
//! lock first after waking wins the free slot.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::WorkflowError;

/// Extra delay added on top of the computed wait.
pub const DEFAULT_BUFFER_MS: u64 = 100;

/// Rate limit settings, as read from the workflow YAML `rate_limit` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_ms() -> u64 {
    60_000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
        }
    }
}

/// Point-in-time view of the governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernorStats {
    pub active: usize,
    pub max: usize,
    pub remaining: usize,
    pub window_ms: u64,
}

pub struct RateGovernor {
    max: usize,
    window: Duration,
    buffer: Duration,
    /// Admission timestamps, oldest first.
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateGovernor {
    pub fn new(config: RateLimitConfig) -> Result<Self, WorkflowError> {
        if config.max_requests == 0 {
            return Err(WorkflowError::config(
                "rate_limit.max_requests must be at least 1",
            ));
        }
        if config.window_ms == 0 {
            return Err(WorkflowError::config(
                "rate_limit.window_ms must be greater than 0",
            ));
        }

        tracing::info!(
            "[RateGovernor] Initialized: {} requests per {}ms",
            config.max_requests,
            config.window_ms
        );

        Ok(Self {
            max: config.max_requests as usize,
            window: Duration::from_millis(config.window_ms),
            buffer: Duration::from_millis(DEFAULT_BUFFER_MS),
            admissions: Mutex::new(VecDeque::with_capacity(config.max_requests as usize)),
        })
    }

    /// Override the buffer added to every computed wait.
    pub fn with_buffer(mut self, buffer: Duration) -> Self {
        self.buffer = buffer;
        self
    }

    /// Wait until a call may be made, then claim the slot.
    ///
    /// Never fails. A burst larger than the limit stalls the excess callers
    /// until the window drains.
    pub async fn acquire_slot(&self) {
        loop {
            let wait = {
                let mut admissions = self.admissions.lock().await;
                let now = Instant::now();
                self.evict_expired(&mut admissions, now);

                tracing::debug!(
                    active = admissions.len(),
                    max = self.max,
                    "[RateGovernor] Checking window"
                );

                if admissions.len() < self.max {
                    admissions.push_back(now);
                    tracing::debug!(
                        active = admissions.len(),
                        remaining = self.max - admissions.len(),
                        "[RateGovernor] Slot acquired"
                    );
                    return;
                }

                // The window is full, so it holds at least one admission.
                let oldest = admissions[0];
                self.window.saturating_sub(now - oldest) + self.buffer
            };

            tracing::info!(
                "[RateGovernor] Rate limit reached ({} in {}ms), waiting {}ms",
                self.max,
                self.window.as_millis(),
                wait.as_millis()
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Current usage of the window. Does not evict anything.
    pub async fn stats(&self) -> GovernorStats {
        let admissions = self.admissions.lock().await;
        let now = Instant::now();
        let active = admissions
            .iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count();

        GovernorStats {
            active,
            max: self.max,
            remaining: self.max.saturating_sub(active),
            window_ms: self.window.as_millis() as u64,
        }
    }

    fn evict_expired(&self, admissions: &mut VecDeque<Instant>, now: Instant) {
        while let Some(front) = admissions.front() {
            if now.duration_since(*front) >= self.window {
                admissions.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn governor(max: u32, window_ms: u64) -> RateGovernor {
        RateGovernor::new(RateLimitConfig {
            max_requests: max,
            window_ms,
        })
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let cfg = RateLimitConfig::default();
        assert_eq!(cfg.max_requests, 5);
        assert_eq!(cfg.window_ms, 60_000);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = RateGovernor::new(RateLimitConfig {
            max_requests: 0,
            window_ms: 1000,
        })
        .err()
        .unwrap();
        assert!(err.is_configuration());

        assert!(RateGovernor::new(RateLimitConfig {
            max_requests: 1,
            window_ms: 0,
        })
        .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_call_waits_for_window() {
        let gov = governor(5, 60_000);
        let start = Instant::now();

        for _ in 0..5 {
            gov.acquire_slot().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        gov.acquire_slot().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(60_000), "elapsed {:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(60_000 + DEFAULT_BUFFER_MS + 10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_never_exceed_window() {
        let gov = Arc::new(governor(5, 60_000));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..12 {
            let gov = gov.clone();
            handles.push(tokio::spawn(async move {
                gov.acquire_slot().await;
                Instant::now()
            }));
        }

        let mut admitted = Vec::new();
        for h in handles {
            admitted.push(h.await.unwrap());
        }
        admitted.sort();

        // Any 6 consecutive admissions must span at least one full window.
        for pair in admitted.windows(6) {
            assert!(pair[5].duration_since(pair[0]) >= Duration::from_millis(60_000));
        }
        assert_eq!(admitted.iter().filter(|t| **t == start).count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_is_observational() {
        let gov = governor(5, 1_000);
        for _ in 0..3 {
            gov.acquire_slot().await;
        }

        let stats = gov.stats().await;
        assert_eq!(
            stats,
            GovernorStats {
                active: 3,
                max: 5,
                remaining: 2,
                window_ms: 1_000
            }
        );

        tokio::time::advance(Duration::from_millis(1_001)).await;
        let stats = gov.stats().await;
        assert_eq!(stats.active, 0);
        assert_eq!(stats.remaining, 5);

        // Expired timestamps are only dropped by acquire_slot.
        assert_eq!(gov.admissions.lock().await.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_free_up_as_window_slides() {
        let gov = governor(2, 1_000).with_buffer(Duration::ZERO);
        let start = Instant::now();

        gov.acquire_slot().await;
        tokio::time::advance(Duration::from_millis(400)).await;
        gov.acquire_slot().await;

        // Third waits for the first admission (t=0) to expire at t=1000.
        gov.acquire_slot().await;
        assert_eq!(start.elapsed(), Duration::from_millis(1_000));

        // Fourth waits for the second admission (t=400) to expire.
        gov.acquire_slot().await;
        assert_eq!(start.elapsed(), Duration::from_millis(1_400));
    }
}
