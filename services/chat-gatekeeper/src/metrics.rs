// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for admission outcomes.

use crate::error::ErrorKind;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Final state of one admission invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmissionOutcome {
    Success,
    RateLimited,
    InvalidInput,
    Failed,
}

impl AdmissionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RateLimited => "rate_limited",
            Self::InvalidInput => "invalid_input",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AdmissionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service metrics backed by a private registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    admissions: IntCounterVec,
    rejections: IntCounterVec,
    latency: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("chat_gatekeeper".to_string()), None)?;

        let admissions = IntCounterVec::new(
            Opts::new("admissions_total", "Admission invocations by outcome"),
            &["handler", "outcome"],
        )?;
        let rejections = IntCounterVec::new(
            Opts::new("rejections_total", "Rejections by reason class"),
            &["reason"],
        )?;
        let latency = Histogram::with_opts(
            HistogramOpts::new("admission_seconds", "Admission plus handler latency")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;

        registry.register(Box::new(admissions.clone()))?;
        registry.register(Box::new(rejections.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            registry,
            admissions,
            rejections,
            latency,
        })
    }

    pub fn record_admission(&self, handler: &str, outcome: AdmissionOutcome, elapsed: Duration) {
        self.admissions
            .with_label_values(&[handler, outcome.as_str()])
            .inc();
        self.latency.observe(elapsed.as_secs_f64());
    }

    pub fn record_rejection(&self, kind: ErrorKind) {
        self.rejections.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn admissions(&self, handler: &str, outcome: AdmissionOutcome) -> u64 {
        self.admissions
            .with_label_values(&[handler, outcome.as_str()])
            .get()
    }

    pub fn rejections(&self, kind: ErrorKind) -> u64 {
        self.rejections.with_label_values(&[kind.as_str()]).get()
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
