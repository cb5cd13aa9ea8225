// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Free-text input sanitizer.
//!
//! Rejects empty or oversized text and text containing a blocked keyword
//! (case-insensitive substring match). Accepted text is returned trimmed.

use crate::config::SanitizerConfig;
use thiserror::Error;
use tracing::warn;

/// Why a message was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("Message is empty")]
    Empty,

    #[error("Message too long: {len} characters (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("Message contains blocked keyword {keyword:?}")]
    BlockedKeyword { keyword: String },
}

/// Input sanitizer built from a fixed keyword list.
#[derive(Debug, Clone)]
pub struct InputSanitizer {
    max_length: usize,
    /// Lowercased once at construction
    keywords: Vec<String>,
}

impl InputSanitizer {
    pub fn new(config: SanitizerConfig) -> Self {
        let keywords = config
            .blocked_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Self {
            max_length: config.max_message_length,
            keywords,
        }
    }

    /// Trimmed text if acceptable, `None` otherwise.
    pub fn sanitize(&self, text: Option<&str>) -> Option<String> {
        text.and_then(|t| self.check(t).ok())
    }

    /// Check `text`, returning the trimmed text or the rejection reason.
    ///
    /// Length is counted in characters on the raw text, before trimming.
    pub fn check(&self, text: &str) -> Result<String, SanitizeError> {
        if text.is_empty() {
            warn!("Message rejected: empty");
            return Err(SanitizeError::Empty);
        }

        let len = text.chars().count();
        if len > self.max_length {
            warn!(len, max = self.max_length, "Message rejected: too long");
            return Err(SanitizeError::TooLong {
                len,
                max: self.max_length,
            });
        }

        let lowered = text.to_lowercase();
        if let Some(keyword) = self.keywords.iter().find(|k| lowered.contains(k.as_str())) {
            // Only the configured keyword is logged, never the user's text
            warn!(keyword = %keyword, "Message rejected: blocked keyword");
            return Err(SanitizeError::BlockedKeyword {
                keyword: keyword.clone(),
            });
        }

        Ok(text.trim().to_string())
    }
}
