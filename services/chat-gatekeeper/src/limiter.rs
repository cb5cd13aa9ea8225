// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter with automatic blocking.
//!
//! Each identity keeps a log of admission timestamps. On every check the
//! entries older than the window are dropped; if the survivors already
//! fill the quota the identity is blocked. Blocks last for the process
//! lifetime unless a block expiry is configured.
//!
//! The read-purge-append-or-block sequence runs under one lock, so two
//! concurrent calls for the same identity can never both take the last
//! slot.

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use crate::event::Identity;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Requests left in the current window
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Reason for rate limiting
        reason: RateLimitReason,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Reason for rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitReason {
    /// This request hit the quota and the identity is now blocked
    QuotaExceeded,
    /// Identity was already blocked
    Blocked,
}

impl std::fmt::Display for RateLimitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded => write!(f, "Request quota exceeded"),
            Self::Blocked => write!(f, "Identity is blocked"),
        }
    }
}

/// Aggregate counters; never carries per-identity data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LimiterStats {
    /// Timestamps currently held across all request logs
    pub total_requests: usize,
    /// Identities currently blocked
    pub blocked_identities: usize,
}

#[derive(Debug, Default)]
struct LimiterState {
    logs: HashMap<Identity, VecDeque<DateTime<Utc>>>,
    /// Identity -> time the block was applied
    blocked: HashMap<Identity, DateTime<Utc>>,
}

/// Thread-safe rate limiter. Owns all request logs and the block set.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    window: TimeDelta,
    block_expiry: Option<TimeDelta>,
    clock: Arc<dyn Clock>,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a new rate limiter using the system clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        // Out-of-range lengths saturate instead of panicking in `check`
        let window = TimeDelta::from_std(config.window_duration()).unwrap_or(TimeDelta::MAX);
        let block_expiry = config
            .block_expiry()
            .map(|expiry| TimeDelta::from_std(expiry).unwrap_or(TimeDelta::MAX));

        Self {
            config,
            window,
            block_expiry,
            clock,
            state: Mutex::new(LimiterState::default()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// `true` if the request may proceed.
    pub async fn admit(&self, identity: &Identity) -> bool {
        self.check(identity).await.is_allowed()
    }

    /// Check and record a request for `identity`.
    pub async fn check(&self, identity: &Identity) -> RateLimitResult {
        let now = self.clock.now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if let Some(since) = state.blocked.get(identity).copied() {
            match self.block_expiry {
                Some(expiry) if now - since >= expiry => {
                    state.blocked.remove(identity);
                    state.logs.remove(identity);
                    info!(%identity, "Block expired, identity admitted again");
                }
                _ => {
                    debug!(%identity, "Blocked identity refused");
                    return RateLimitResult::Limited {
                        reason: RateLimitReason::Blocked,
                    };
                }
            }
        }

        let window = self.window;
        let max = self.config.max_requests_per_window as usize;

        let log = state.logs.entry(identity.clone()).or_default();
        log.retain(|t| now - *t < window);

        if log.len() >= max {
            let requests = log.len();
            state.blocked.insert(identity.clone(), now);
            warn!(
                %identity,
                requests,
                window_secs = self.config.window_secs,
                "Identity blocked for exceeding request quota"
            );
            return RateLimitResult::Limited {
                reason: RateLimitReason::QuotaExceeded,
            };
        }

        log.push_back(now);
        RateLimitResult::Allowed {
            remaining: (max - log.len()) as u32,
        }
    }

    /// Aggregate counters for the status report.
    pub async fn stats(&self) -> LimiterStats {
        let state = self.state.lock().await;
        LimiterStats {
            total_requests: state.logs.values().map(VecDeque::len).sum(),
            blocked_identities: state.blocked.len(),
        }
    }
}
