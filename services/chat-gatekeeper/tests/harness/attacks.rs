// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Attack simulation patterns for security testing.

use std::time::Duration;

/// What each simulated message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// Plain command text
    Command,
    /// Command followed by a blocked keyword
    Injection,
    /// Command padded past the length limit
    Oversized,
    /// Update with no sender attached
    Anonymous,
}

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of messages to send
    pub total_requests: usize,
    /// Simulated seconds between consecutive messages
    pub interval: Duration,
    /// Number of distinct sender ids
    pub unique_users: usize,
    /// Message content
    pub payload: Payload,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            interval: Duration::from_secs(1),
            unique_users: 1,
            payload: Payload::Command,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// One account hammering a command.
    pub fn single_user_flood() -> Self {
        Self {
            total_requests: 300,
            interval: Duration::from_millis(100),
            ..Default::default()
        }
    }

    /// Many accounts, each staying under its own quota.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 1000,
            interval: Duration::from_millis(10),
            unique_users: 100,
            ..Default::default()
        }
    }

    /// Script and eval payloads appended to commands.
    pub fn keyword_injection() -> Self {
        Self {
            total_requests: 50,
            unique_users: 50,
            payload: Payload::Injection,
            ..Default::default()
        }
    }

    /// Messages longer than the configured maximum.
    pub fn oversized_messages() -> Self {
        Self {
            total_requests: 50,
            unique_users: 50,
            payload: Payload::Oversized,
            ..Default::default()
        }
    }

    /// Senders without an identity share one bucket.
    pub fn anonymous_flood() -> Self {
        Self {
            total_requests: 200,
            payload: Payload::Anonymous,
            ..Default::default()
        }
    }

    /// Slow drip: one message a minute, never more than the hourly quota.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 180,
            interval: Duration::from_secs(60),
            ..Default::default()
        }
    }

    /// Simulated span of the whole attack.
    pub fn expected_duration(&self) -> Duration {
        self.interval * self.total_requests as u32
    }
}
