// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Verification of platform-signed key/value payloads.
//!
//! The platform signs web-app payloads as follows:
//!
//! 1. drop the detached `hash` field,
//! 2. sort the remaining pairs by key and join them as `key=value` lines,
//! 3. derive `secret_key = SHA-256(bot_token)`,
//! 4. `hash = hex(HMAC-SHA256(secret_key, check_string))`.
//!
//! Payloads older than [`MAX_PAYLOAD_AGE_SECS`] are rejected even with a
//! correct hash.

use crate::clock::{Clock, SystemClock};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Freshness bound for `auth_date`, in seconds.
pub const MAX_PAYLOAD_AGE_SECS: i64 = 3600;

const HASH_FIELD: &str = "hash";
const AUTH_DATE_FIELD: &str = "auth_date";

/// Why a signed payload failed verification.
///
/// Only used internally and in debug logs; callers of
/// [`SignatureValidator::validate`] get a plain `false` for all of them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing auth_date")]
    MissingAuthDate,

    #[error("auth_date is not an integer timestamp")]
    InvalidAuthDate,

    #[error("payload is stale ({age_secs}s old)")]
    Stale { age_secs: i64 },

    #[error("missing hash")]
    MissingHash,

    #[error("hash mismatch")]
    Mismatch,
}

/// Validates platform-signed payloads against the shared secret.
#[derive(Debug, Clone)]
pub struct SignatureValidator {
    clock: Arc<dyn Clock>,
}

impl Default for SignatureValidator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl SignatureValidator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// `true` only for an exact hash match within the freshness window.
    ///
    /// The caller's map is left untouched; the `hash` field is excluded
    /// from the check string on a copy.
    pub fn validate(&self, payload: &HashMap<String, String>, secret: &str) -> bool {
        match self.verify(payload, secret) {
            Ok(()) => true,
            Err(err) => {
                debug!(reason = %err, "Signed payload rejected");
                false
            }
        }
    }

    /// Same check as [`validate`](Self::validate) but keeps the reason.
    pub fn verify(
        &self,
        payload: &HashMap<String, String>,
        secret: &str,
    ) -> Result<(), SignatureError> {
        let auth_date: i64 = payload
            .get(AUTH_DATE_FIELD)
            .ok_or(SignatureError::MissingAuthDate)?
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidAuthDate)?;

        let age_secs = self
            .clock
            .now()
            .timestamp()
            .checked_sub(auth_date)
            .ok_or(SignatureError::InvalidAuthDate)?;
        if age_secs > MAX_PAYLOAD_AGE_SECS {
            return Err(SignatureError::Stale { age_secs });
        }

        let provided = payload.get(HASH_FIELD).ok_or(SignatureError::MissingHash)?;
        let expected = sign_payload(payload, secret);

        if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

/// Canonical check string: pairs sorted by key, `hash` excluded,
/// joined as `key=value` lines.
pub fn data_check_string(payload: &HashMap<String, String>) -> String {
    let sorted: BTreeMap<&str, &str> = payload
        .iter()
        .filter(|(k, _)| k.as_str() != HASH_FIELD)
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    sorted
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compute the lowercase hex hash the platform would attach to `payload`.
pub fn sign_payload(payload: &HashMap<String, String>, secret: &str) -> String {
    let secret_key = Sha256::digest(secret.as_bytes());

    let mut mac = HmacSha256::new_from_slice(&secret_key)
        .expect("HMAC can take key of any size");
    mac.update(data_check_string(payload).as_bytes());

    hex::encode(mac.finalize().into_bytes())
}

/// Parse a URL-encoded payload (`a=1&b=2`) into a key/value map.
///
/// Later duplicates win, matching how the platform's own clients read it.
pub fn parse_init_data(raw: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(raw.trim().as_bytes())
        .into_owned()
        .collect()
}
