// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for attack simulation results.

use chat_gatekeeper::event::Identity;
use std::collections::HashMap;
use std::time::Duration;

/// Collects metrics during attack simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    /// Count of requests by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Count of requests by sender
    requests_per_identity: HashMap<Identity, usize>,
    /// Admission latency samples (microseconds)
    latencies: Vec<u64>,
}

/// Possible outcomes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    QuotaExceeded,
    Blocked,
    InvalidInput,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request outcome.
    pub fn record(&mut self, outcome: Outcome, identity: &Identity, latency: Duration) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self
            .requests_per_identity
            .entry(identity.clone())
            .or_insert(0) += 1;
        self.latencies.push(latency.as_micros() as u64);
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Ratio of refused requests to total.
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        let allowed = self.count(Outcome::Allowed);
        (total - allowed) as f64 / total as f64
    }

    pub fn median_latency_us(&self) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        sorted[sorted.len() / 2]
    }

    pub fn p99_latency_us(&self) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        let idx = (sorted.len() as f64 * 0.99) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn unique_identities(&self) -> usize {
        self.requests_per_identity.len()
    }

    /// Generate a summary report.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_requests: self.total_requests(),
            allowed: self.count(Outcome::Allowed),
            quota_exceeded: self.count(Outcome::QuotaExceeded),
            blocked: self.count(Outcome::Blocked),
            invalid_input: self.count(Outcome::InvalidInput),
            block_rate: self.block_rate(),
            median_latency_us: self.median_latency_us(),
            p99_latency_us: self.p99_latency_us(),
            unique_identities: self.unique_identities(),
        }
    }
}

/// Summary report of attack metrics.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_requests: usize,
    pub allowed: usize,
    pub quota_exceeded: usize,
    pub blocked: usize,
    pub invalid_input: usize,
    pub block_rate: f64,
    pub median_latency_us: u64,
    pub p99_latency_us: u64,
    pub unique_identities: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Attack Metrics Report ===")?;
        writeln!(f, "Total Requests:    {}", self.total_requests)?;
        writeln!(f)?;
        writeln!(f, "--- Outcomes ---")?;
        writeln!(f, "Allowed:           {}", self.allowed)?;
        writeln!(f, "Quota Exceeded:    {}", self.quota_exceeded)?;
        writeln!(f, "Blocked:           {}", self.blocked)?;
        writeln!(f, "Invalid Input:     {}", self.invalid_input)?;
        writeln!(f, "Block Rate:        {:.1}%", self.block_rate * 100.0)?;
        writeln!(f)?;
        writeln!(f, "--- Latency ---")?;
        writeln!(f, "Median:            {} us", self.median_latency_us)?;
        writeln!(f, "P99:               {} us", self.p99_latency_us)?;
        writeln!(f)?;
        writeln!(f, "Unique Senders:    {}", self.unique_identities)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let mut metrics = AttackMetrics::new();
        let user = Identity::User(1);

        metrics.record(Outcome::Allowed, &user, Duration::from_micros(100));
        metrics.record(Outcome::Allowed, &user, Duration::from_micros(150));
        metrics.record(Outcome::QuotaExceeded, &Identity::Anonymous, Duration::from_micros(50));

        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.count(Outcome::Allowed), 2);
        assert_eq!(metrics.unique_identities(), 2);
        assert_eq!(metrics.median_latency_us(), 100);
    }

    #[test]
    fn test_block_rate() {
        let mut metrics = AttackMetrics::new();
        let user = Identity::User(1);
        for _ in 0..3 {
            metrics.record(Outcome::Allowed, &user, Duration::ZERO);
        }
        for _ in 0..7 {
            metrics.record(Outcome::Blocked, &user, Duration::ZERO);
        }

        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
    }
}
