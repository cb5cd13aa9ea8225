// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types and rejection reason classes for the admission pipeline.

use thiserror::Error;

/// Reason class attached to every rejection in logs and metrics.
///
/// Only the class is ever recorded; payload content stays out of the
/// observability stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad or missing signature, or a stale `auth_date`
    AuthenticityFailure,
    /// Quota exceeded or identity blocked
    RateLimited,
    /// Empty, oversized or forbidden-content text
    InvalidInput,
    /// Unexpected failure inside a command handler
    HandlerFault,
    /// Non-admin invoking a privileged command
    Unauthorized,
}

impl ErrorKind {
    /// Stable label used for metrics and structured logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticityFailure => "authenticity_failure",
            Self::RateLimited => "rate_limited",
            Self::InvalidInput => "invalid_input",
            Self::HandlerFault => "handler_fault",
            Self::Unauthorized => "unauthorized",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised by a command handler.
///
/// The admission layer maps every variant to the same generic notice;
/// the detail only reaches the logs.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler panicked")]
    Panicked,

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Generic error code logged alongside the handler name.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Panicked => "E_PANIC",
            Self::Internal(_) => "E_INTERNAL",
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{key} must be at most {max}")]
    TooLarge { key: &'static str, max: u64 },

    #[error("URL for {key} is not allowed: {reason}")]
    DisallowedUrl { key: &'static str, reason: String },
}
