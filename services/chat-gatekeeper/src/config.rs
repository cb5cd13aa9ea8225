// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the chat gatekeeper.
//!
//! Everything is read once at start-up from environment variables and is
//! never mutated afterwards. Components receive the sub-section they need
//! by value.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Upper bound for window and block-expiry lengths: ten years.
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 3600;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Bot credential and companion web surface
    #[serde(default)]
    pub bot: BotConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Input sanitization configuration
    #[serde(default)]
    pub sanitizer: SanitizerConfig,

    /// Privileged command access
    #[serde(default)]
    pub access: AccessConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// A credential that never shows up in `Debug` output or serialized config.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw credential. Callers must not log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

/// Bot credential and the links rendered on keyboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot credential; doubles as the shared secret for signed payloads
    #[serde(default)]
    pub token: Secret,

    /// Companion web application opened from web-app buttons
    #[serde(default = "default_web_app_url")]
    pub web_app_url: String,

    /// Optional public channel link shown on /start
    #[serde(default)]
    pub channel_url: Option<String>,

    /// Optional contact link shown on /start
    #[serde(default)]
    pub contact_url: Option<String>,

    /// Optional photo sent with the /start welcome
    #[serde(default)]
    pub welcome_photo_url: Option<String>,

    /// Hosts (and their subdomains) allowed in button URLs
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,

    /// Expected value of the webhook secret header, if any
    #[serde(default)]
    pub webhook_secret: Option<Secret>,
}

/// Sliding-window rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window per identity (default: 100)
    #[serde(default = "default_max_requests")]
    pub max_requests_per_window: u32,

    /// Sliding window length in seconds (default: 3600)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Lift blocks after this many seconds; `None` keeps them for the
    /// process lifetime
    #[serde(default)]
    pub block_expiry_secs: Option<u64>,
}

/// Input sanitization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Maximum message length in characters (default: 1000)
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// Case-insensitive forbidden substrings
    #[serde(default = "default_blocked_keywords")]
    pub blocked_keywords: Vec<String>,
}

/// Administrator allow-list for privileged commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub admin_ids: Vec<i64>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_web_app_url() -> String {
    "https://mini-app.example.vercel.app".to_string()
}

fn default_allowed_domains() -> Vec<String> {
    vec![
        "telegram.org".to_string(),
        "t.me".to_string(),
        "vercel.app".to_string(),
    ]
}

fn default_max_requests() -> u32 {
    100
}

fn default_window_secs() -> u64 {
    3600
}

fn default_max_message_length() -> usize {
    1000
}

fn default_blocked_keywords() -> Vec<String> {
    ["script", "javascript", "eval", "function", "alert"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            bot: BotConfig::default(),
            rate_limit: RateLimitConfig::default(),
            sanitizer: SanitizerConfig::default(),
            access: AccessConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: Secret::default(),
            web_app_url: default_web_app_url(),
            channel_url: None,
            contact_url: None,
            welcome_photo_url: None,
            allowed_domains: default_allowed_domains(),
            webhook_secret: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: default_max_requests(),
            window_secs: default_window_secs(),
            block_expiry_secs: None,
        }
    }
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_message_length: default_max_message_length(),
            blocked_keywords: default_blocked_keywords(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the sliding window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Get the block expiry, if blocks expire at all
    pub fn block_expiry(&self) -> Option<Duration> {
        self.block_expiry_secs.map(Duration::from_secs)
    }
}

impl AccessConfig {
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unset keys fall back to defaults; set-but-unparseable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Config {
            bind_addr: get("BIND_ADDR").unwrap_or_else(default_bind_addr),
            bot: BotConfig {
                token: Secret::new(get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?),
                web_app_url: get("WEB_APP_URL").unwrap_or_else(default_web_app_url),
                channel_url: get("CHANNEL_URL"),
                contact_url: get("CONTACT_URL"),
                welcome_photo_url: get("WELCOME_PHOTO_URL"),
                allowed_domains: get("ALLOWED_DOMAINS")
                    .map(|v| parse_list(&v))
                    .unwrap_or_else(default_allowed_domains),
                webhook_secret: get("WEBHOOK_SECRET").map(Secret::new),
            },
            rate_limit: RateLimitConfig {
                max_requests_per_window: parse_or(
                    &get,
                    "MAX_REQUESTS_PER_WINDOW",
                    default_max_requests(),
                )?,
                window_secs: parse_or(&get, "RATE_LIMIT_WINDOW_SECS", default_window_secs())?,
                block_expiry_secs: get("BLOCK_EXPIRY_SECS")
                    .map(|v| parse_value("BLOCK_EXPIRY_SECS", &v))
                    .transpose()?,
            },
            sanitizer: SanitizerConfig {
                max_message_length: parse_or(
                    &get,
                    "MAX_MESSAGE_LENGTH",
                    default_max_message_length(),
                )?,
                blocked_keywords: get("BLOCKED_KEYWORDS")
                    .map(|v| parse_list(&v))
                    .unwrap_or_else(default_blocked_keywords),
            },
            access: AccessConfig {
                admin_ids: get("ADMIN_IDS")
                    .map(|v| {
                        parse_list(&v)
                            .iter()
                            .map(|id| parse_value("ADMIN_IDS", id))
                            .collect::<Result<Vec<i64>, _>>()
                    })
                    .transpose()?
                    .unwrap_or_default(),
            },
            metrics: MetricsConfig {
                enabled: parse_or(&get, "METRICS_ENABLED", default_true())?,
                path: get("METRICS_PATH").unwrap_or_else(default_metrics_path),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.token.is_empty() {
            return Err(ConfigError::Missing("BOT_TOKEN"));
        }
        if self.rate_limit.max_requests_per_window == 0 {
            return Err(ConfigError::Zero("MAX_REQUESTS_PER_WINDOW"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Zero("RATE_LIMIT_WINDOW_SECS"));
        }
        if self.rate_limit.window_secs > MAX_DURATION_SECS {
            return Err(ConfigError::TooLarge {
                key: "RATE_LIMIT_WINDOW_SECS",
                max: MAX_DURATION_SECS,
            });
        }
        match self.rate_limit.block_expiry_secs {
            Some(0) => return Err(ConfigError::Zero("BLOCK_EXPIRY_SECS")),
            Some(secs) if secs > MAX_DURATION_SECS => {
                return Err(ConfigError::TooLarge {
                    key: "BLOCK_EXPIRY_SECS",
                    max: MAX_DURATION_SECS,
                })
            }
            _ => {}
        }
        if self.sanitizer.max_message_length == 0 {
            return Err(ConfigError::Zero("MAX_MESSAGE_LENGTH"));
        }

        self.check_url("WEB_APP_URL", &self.bot.web_app_url)?;
        if let Some(url) = &self.bot.channel_url {
            self.check_url("CHANNEL_URL", url)?;
        }
        if let Some(url) = &self.bot.contact_url {
            self.check_url("CONTACT_URL", url)?;
        }
        Ok(())
    }

    /// Button URLs must be https and point at an allowed domain.
    fn check_url(&self, key: &'static str, raw: &str) -> Result<(), ConfigError> {
        let disallowed = |reason: String| ConfigError::DisallowedUrl { key, reason };

        let url = Url::parse(raw).map_err(|e| disallowed(e.to_string()))?;
        if url.scheme() != "https" {
            return Err(disallowed(format!("scheme {} is not https", url.scheme())));
        }
        let host = url
            .host_str()
            .ok_or_else(|| disallowed("missing host".to_string()))?
            .to_lowercase();

        let allowed = self.bot.allowed_domains.iter().any(|domain| {
            let domain = domain.to_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        });
        if !allowed {
            return Err(disallowed(format!("host {host} is not in the allowed domains")));
        }
        Ok(())
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}
