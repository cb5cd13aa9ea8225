// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission middleware wrapped around every command handler.
//!
//! Each invocation runs a fixed chain of stages before the handler:
//!
//! ```text
//! IDENTIFY -> RATE_CHECK -> SANITIZE_CHECK (text only) -> INVOKE_HANDLER
//! ```
//!
//! Any stage can short-circuit with a [`Rejection`], which becomes a fixed
//! notice. Handler errors and panics all become the generic failure notice;
//! their detail only reaches the logs.

use crate::error::{ErrorKind, HandlerError};
use crate::event::InboundEvent;
use crate::limiter::{RateLimitReason, RateLimitResult, RateLimiter};
use crate::metrics::{AdmissionOutcome, Metrics};
use crate::reply::{Reply, GENERIC_ERROR_NOTICE, INVALID_INPUT_NOTICE, RATE_LIMITED_NOTICE};
use crate::sanitizer::{InputSanitizer, SanitizeError};
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// A command handler.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &InboundEvent) -> Result<Reply, HandlerError>;
}

/// Expected, non-exceptional refusal by an admission stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    RateLimited(RateLimitReason),
    InvalidInput(SanitizeError),
}

impl Rejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Rejection::RateLimited(_) => ErrorKind::RateLimited,
            Rejection::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// User-facing text; specific to the class but never to the cause.
    pub fn notice(&self) -> &'static str {
        match self {
            Rejection::RateLimited(_) => RATE_LIMITED_NOTICE,
            Rejection::InvalidInput(_) => INVALID_INPUT_NOTICE,
        }
    }

    fn outcome(&self) -> AdmissionOutcome {
        match self {
            Rejection::RateLimited(_) => AdmissionOutcome::RateLimited,
            Rejection::InvalidInput(_) => AdmissionOutcome::InvalidInput,
        }
    }
}

pub enum StageOutcome {
    Pass,
    Reject(Rejection),
}

/// One admission gate. Stages may normalize the event they pass on.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, event: &mut InboundEvent) -> StageOutcome;
}

/// Gates every event on the caller's rate limit.
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
}

impl RateLimitStage {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn check(&self, event: &mut InboundEvent) -> StageOutcome {
        match self.limiter.check(&event.identity).await {
            RateLimitResult::Allowed { .. } => StageOutcome::Pass,
            RateLimitResult::Limited { reason } => {
                StageOutcome::Reject(Rejection::RateLimited(reason))
            }
        }
    }
}

/// Sanitizes free text when the event carries any; passes otherwise.
pub struct SanitizeStage {
    sanitizer: Arc<InputSanitizer>,
}

impl SanitizeStage {
    pub fn new(sanitizer: Arc<InputSanitizer>) -> Self {
        Self { sanitizer }
    }
}

#[async_trait]
impl Stage for SanitizeStage {
    fn name(&self) -> &'static str {
        "sanitize"
    }

    async fn check(&self, event: &mut InboundEvent) -> StageOutcome {
        let Some(text) = event.text.as_deref() else {
            return StageOutcome::Pass;
        };
        match self.sanitizer.check(text) {
            Ok(clean) => {
                event.text = Some(clean);
                StageOutcome::Pass
            }
            Err(err) => StageOutcome::Reject(Rejection::InvalidInput(err)),
        }
    }
}

/// Ordered stage chain plus the handler boundary.
pub struct AdmissionPipeline {
    stages: Vec<Arc<dyn Stage>>,
    metrics: Metrics,
}

impl AdmissionPipeline {
    /// Standard chain: rate limit for every event, then sanitization for
    /// events with text.
    pub fn new(limiter: Arc<RateLimiter>, sanitizer: Arc<InputSanitizer>, metrics: Metrics) -> Self {
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(RateLimitStage::new(limiter)) as Arc<dyn Stage>,
            Arc::new(SanitizeStage::new(sanitizer)) as Arc<dyn Stage>,
        ];
        Self::with_stages(stages, metrics)
    }

    pub fn with_stages(stages: Vec<Arc<dyn Stage>>, metrics: Metrics) -> Self {
        Self { stages, metrics }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run every stage in order, stopping at the first rejection.
    pub async fn admit(&self, event: &mut InboundEvent) -> Result<(), Rejection> {
        for stage in &self.stages {
            if let StageOutcome::Reject(rejection) = stage.check(event).await {
                debug!(stage = stage.name(), identity = %event.identity, "Stage rejected event");
                return Err(rejection);
            }
        }
        Ok(())
    }

    /// Admit `event` and invoke `handler`, always producing a reply.
    pub async fn run(&self, handler: &dyn Handler, event: &InboundEvent) -> Reply {
        let started = Instant::now();
        let handler_name = handler.name();
        let mut event = event.clone();

        let (outcome, reply) = match self.admit(&mut event).await {
            Err(rejection) => {
                let kind = rejection.kind();
                self.metrics.record_rejection(kind);
                info!(
                    handler = handler_name,
                    identity = %event.identity,
                    reason = %kind,
                    "Request rejected"
                );
                (rejection.outcome(), Reply::text(event.chat_id, rejection.notice()))
            }
            Ok(()) => {
                let result = AssertUnwindSafe(handler.handle(&event))
                    .catch_unwind()
                    .await
                    .unwrap_or(Err(HandlerError::Panicked));

                match result {
                    Ok(reply) => (AdmissionOutcome::Success, reply),
                    Err(err) => {
                        self.metrics.record_rejection(ErrorKind::HandlerFault);
                        error!(
                            handler = handler_name,
                            identity = %event.identity,
                            code = err.code(),
                            error = %err,
                            "Handler failed"
                        );
                        (
                            AdmissionOutcome::Failed,
                            Reply::text(event.chat_id, GENERIC_ERROR_NOTICE),
                        )
                    }
                }
            }
        };

        let elapsed = started.elapsed();
        self.metrics.record_admission(handler_name, outcome, elapsed);
        info!(
            handler = handler_name,
            identity = %event.identity,
            outcome = %outcome,
            latency_us = elapsed.as_micros() as u64,
            "Admission complete"
        );
        reply
    }
}

/// A handler wrapped by the admission pipeline. Same signature as the
/// handler it wraps, but it never returns an error.
pub struct Guarded<H> {
    pipeline: Arc<AdmissionPipeline>,
    inner: H,
}

impl<H: Handler> Guarded<H> {
    pub fn new(pipeline: Arc<AdmissionPipeline>, inner: H) -> Self {
        Self { pipeline, inner }
    }
}

#[async_trait]
impl<H: Handler> Handler for Guarded<H> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn handle(&self, event: &InboundEvent) -> Result<Reply, HandlerError> {
        Ok(self.pipeline.run(&self.inner, event).await)
    }
}
