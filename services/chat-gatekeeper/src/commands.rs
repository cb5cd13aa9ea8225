// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Bot commands and the command router.
//!
//! Handlers here see only admitted events: rate limiting and sanitization
//! have already run. The router wraps every registered handler in the
//! admission pipeline.

use crate::config::{AccessConfig, BotConfig};
use crate::error::{ErrorKind, HandlerError};
use crate::event::InboundEvent;
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;
use crate::middleware::{AdmissionPipeline, Guarded, Handler};
use crate::reply::{Button, Reply, ACCESS_DENIED_NOTICE, GENERIC_ERROR_NOTICE};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

const WELCOME_TEXT: &str = "*💎 Welcome!*\n\n\
    To place an order or get in touch, use the options below.";
const MENU_TEXT: &str = "🍽️ Browse our menu:";

/// `/start`: welcome message with channel, contact and web-app buttons.
pub struct StartCommand {
    bot: BotConfig,
}

impl StartCommand {
    pub fn new(bot: BotConfig) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Handler for StartCommand {
    fn name(&self) -> &'static str {
        "start"
    }

    async fn handle(&self, event: &InboundEvent) -> Result<Reply, HandlerError> {
        let reply = match &self.bot.welcome_photo_url {
            Some(photo) => Reply::photo(event.chat_id, photo, WELCOME_TEXT),
            None => Reply::text(event.chat_id, WELCOME_TEXT),
        };

        let mut links = Vec::new();
        if let Some(url) = &self.bot.channel_url {
            links.push(Button::url("📢 Official channel", url));
        }
        if let Some(url) = &self.bot.contact_url {
            links.push(Button::url("💬 Contact us", url));
        }

        Ok(reply
            .markdown()
            .with_row(links)
            .with_row(vec![Button::web_app("📖 VIEW THE MENU 📖", &self.bot.web_app_url)]))
    }
}

/// `/menu`: direct link into the web app.
pub struct MenuCommand {
    web_app_url: String,
}

impl MenuCommand {
    pub fn new(web_app_url: impl Into<String>) -> Self {
        Self {
            web_app_url: web_app_url.into(),
        }
    }
}

#[async_trait]
impl Handler for MenuCommand {
    fn name(&self) -> &'static str {
        "menu"
    }

    async fn handle(&self, event: &InboundEvent) -> Result<Reply, HandlerError> {
        Ok(Reply::text(event.chat_id, MENU_TEXT)
            .with_row(vec![Button::web_app("🍕 View the menu", &self.web_app_url)]))
    }
}

/// Aggregate security counters. Carries no identities and no secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub total_requests: usize,
    pub blocked_identities: usize,
    pub window_secs: u64,
    pub max_requests_per_window: u32,
}

impl StatusReport {
    pub async fn collect(limiter: &RateLimiter) -> Self {
        let stats = limiter.stats().await;
        let config = limiter.config();

        Self {
            total_requests: stats.total_requests,
            blocked_identities: stats.blocked_identities,
            window_secs: config.window_secs,
            max_requests_per_window: config.max_requests_per_window,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🛡️ *Security status*")?;
        writeln!(f)?;
        writeln!(f, "📊 Total requests: {}", self.total_requests)?;
        writeln!(f, "🚫 Blocked users: {}", self.blocked_identities)?;
        writeln!(f, "⏰ Rate limit window: {}s", self.window_secs)?;
        write!(f, "🔢 Max requests per window: {}", self.max_requests_per_window)
    }
}

/// `/security`: status report for administrators only.
pub struct SecurityStatusCommand {
    access: AccessConfig,
    limiter: Arc<RateLimiter>,
    metrics: Metrics,
}

impl SecurityStatusCommand {
    pub fn new(access: AccessConfig, limiter: Arc<RateLimiter>, metrics: Metrics) -> Self {
        Self {
            access,
            limiter,
            metrics,
        }
    }
}

#[async_trait]
impl Handler for SecurityStatusCommand {
    fn name(&self) -> &'static str {
        "security"
    }

    async fn handle(&self, event: &InboundEvent) -> Result<Reply, HandlerError> {
        let is_admin = event
            .identity
            .user_id()
            .is_some_and(|id| self.access.is_admin(id));

        if !is_admin {
            self.metrics.record_rejection(ErrorKind::Unauthorized);
            warn!(
                identity = %event.identity,
                reason = %ErrorKind::Unauthorized,
                "Privileged command refused"
            );
            return Ok(Reply::text(event.chat_id, ACCESS_DENIED_NOTICE));
        }

        let report = StatusReport::collect(&self.limiter).await;
        Ok(Reply::text(event.chat_id, report.to_string()).markdown())
    }
}

/// Maps command names to guarded handlers.
pub struct CommandRouter {
    pipeline: Arc<AdmissionPipeline>,
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl CommandRouter {
    pub fn new(pipeline: Arc<AdmissionPipeline>) -> Self {
        Self {
            pipeline,
            handlers: HashMap::new(),
        }
    }

    /// Router with `/start`, `/menu` and `/security` registered.
    pub fn standard(
        pipeline: Arc<AdmissionPipeline>,
        bot: &BotConfig,
        access: &AccessConfig,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let metrics = pipeline.metrics().clone();
        let mut router = Self::new(pipeline);
        router.register(StartCommand::new(bot.clone()));
        router.register(MenuCommand::new(bot.web_app_url.clone()));
        router.register(SecurityStatusCommand::new(access.clone(), limiter, metrics));
        router
    }

    /// Register `handler` under its own name, wrapped in admission.
    pub fn register<H: Handler + 'static>(&mut self, handler: H) {
        let name = handler.name();
        let guarded = Guarded::new(Arc::clone(&self.pipeline), handler);
        self.handlers.insert(name, Box::new(guarded));
    }

    pub fn commands(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Reply for a command event, or `None` when nothing handles it.
    pub async fn dispatch(&self, event: &InboundEvent) -> Option<Reply> {
        let command = event.command.as_deref()?;
        let Some(handler) = self.handlers.get(command) else {
            debug!(command, "Unknown command ignored");
            return None;
        };

        match handler.handle(event).await {
            Ok(reply) => Some(reply),
            // Guarded handlers always return Ok
            Err(_) => Some(Reply::text(event.chat_id, GENERIC_ERROR_NOTICE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RateLimitConfig, SanitizerConfig};
    use crate::event::Identity;
    use crate::reply::{ReplyBody, RATE_LIMITED_NOTICE};
    use crate::sanitizer::InputSanitizer;

    const ADMIN: i64 = 123_456_789;

    fn router(max: u32) -> (CommandRouter, Arc<RateLimiter>) {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            max_requests_per_window: max,
            ..Default::default()
        }));
        let sanitizer = Arc::new(InputSanitizer::new(SanitizerConfig::default()));
        let pipeline = Arc::new(AdmissionPipeline::new(
            limiter.clone(),
            sanitizer,
            Metrics::new().unwrap(),
        ));
        let bot = BotConfig {
            channel_url: Some("https://t.me/+channel".to_string()),
            ..Default::default()
        };
        let access = AccessConfig {
            admin_ids: vec![ADMIN],
        };
        (
            CommandRouter::standard(pipeline, &bot, &access, limiter.clone()),
            limiter,
        )
    }

    fn command(identity: Identity, text: &str) -> InboundEvent {
        InboundEvent {
            identity,
            username: None,
            chat_id: 1,
            text: Some(text.to_string()),
            command: crate::event::parse_command(text),
        }
    }

    #[test]
    fn test_standard_commands_registered() {
        let (router, _) = router(10);
        assert_eq!(router.commands(), vec!["menu", "security", "start"]);
    }

    #[tokio::test]
    async fn test_start_keyboard_layout() {
        let (router, _) = router(10);
        let reply = router
            .dispatch(&command(Identity::User(1), "/start"))
            .await
            .unwrap();

        assert!(matches!(reply.body, ReplyBody::Text(_)));
        assert_eq!(reply.keyboard.len(), 2);
        assert_eq!(reply.keyboard[0].len(), 1); // channel only, no contact configured
        assert!(matches!(reply.keyboard[1][0], Button::WebApp { .. }));
    }

    #[tokio::test]
    async fn test_security_denied_for_non_admin() {
        let (router, _) = router(10);
        let reply = router
            .dispatch(&command(Identity::User(2), "/security"))
            .await
            .unwrap();
        assert_eq!(reply.visible_text(), ACCESS_DENIED_NOTICE);

        let anonymous = router
            .dispatch(&command(Identity::Anonymous, "/security"))
            .await
            .unwrap();
        assert_eq!(anonymous.visible_text(), ACCESS_DENIED_NOTICE);
    }

    #[tokio::test]
    async fn test_security_report_for_admin() {
        let (router, _) = router(10);
        router.dispatch(&command(Identity::User(5), "/menu")).await;

        let reply = router
            .dispatch(&command(Identity::User(ADMIN), "/security"))
            .await
            .unwrap();
        let text = reply.visible_text();

        // /menu plus the /security call itself
        assert!(text.contains("Total requests: 2"));
        assert!(text.contains("Blocked users: 0"));
        assert!(text.contains("3600s"));
        assert!(text.contains("Max requests per window: 10"));
        assert!(!text.contains("user:5"));
    }

    #[tokio::test]
    async fn test_unknown_and_plain_text_ignored() {
        let (router, limiter) = router(10);
        assert!(router.dispatch(&command(Identity::User(1), "/unknown")).await.is_none());
        assert!(router.dispatch(&command(Identity::User(1), "hello")).await.is_none());
        assert_eq!(limiter.stats().await.total_requests, 0);
    }

    #[tokio::test]
    async fn test_commands_share_one_quota() {
        let (router, _) = router(2);
        let user = Identity::User(8);

        router.dispatch(&command(user.clone(), "/start")).await;
        router.dispatch(&command(user.clone(), "/menu")).await;
        let reply = router.dispatch(&command(user, "/start")).await.unwrap();
        assert_eq!(reply.visible_text(), RATE_LIMITED_NOTICE);
    }
}
