// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Chat Gatekeeper
//!
//! Request admission front end for a chat bot. Every command passes
//! through the same pipeline before any business logic runs:
//!
//! - Per-identity sliding-window rate limiting (100 per hour default)
//! - Automatic blocking of identities that exceed the quota
//! - Free-text sanitization (length bound + blocked keywords)
//! - Handler fault isolation behind a generic notice
//!
//! Payloads handed back by the companion web app are verified separately
//! against the platform's HMAC-SHA256 signing scheme.

pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod reply;
pub mod sanitizer;
pub mod signature;

pub use config::Config;
pub use limiter::{RateLimitResult, RateLimiter};
pub use middleware::{AdmissionPipeline, Guarded, Handler};
pub use sanitizer::InputSanitizer;
pub use signature::SignatureValidator;
