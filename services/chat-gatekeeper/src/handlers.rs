// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the chat gatekeeper service.
//!
//! The platform delivers updates to `/webhook`; replies go back in the
//! response body. The companion web app posts its signed init data to
//! `/webapp/verify`.

use crate::clock::Clock;
use crate::commands::CommandRouter;
use crate::config::Config;
use crate::error::ErrorKind;
use crate::event::{InboundEvent, Update};
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;
use crate::middleware::AdmissionPipeline;
use crate::sanitizer::InputSanitizer;
use crate::signature::{parse_init_data, SignatureValidator};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use url::Url;

/// Header carrying the webhook secret configured with the platform.
pub const WEBHOOK_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Shared application state.
pub struct AppState {
    pub commands: CommandRouter,
    pub limiter: Arc<RateLimiter>,
    pub validator: SignatureValidator,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    /// Wire every component from `config` around a single clock.
    pub fn build(config: Config, clock: Arc<dyn Clock>) -> Result<Self, prometheus::Error> {
        let metrics = Metrics::new()?;
        let limiter = Arc::new(RateLimiter::with_clock(
            config.rate_limit.clone(),
            Arc::clone(&clock),
        ));
        let sanitizer = Arc::new(InputSanitizer::new(config.sanitizer.clone()));
        let pipeline = Arc::new(AdmissionPipeline::new(
            Arc::clone(&limiter),
            sanitizer,
            metrics.clone(),
        ));
        let commands = CommandRouter::standard(
            pipeline,
            &config.bot,
            &config.access,
            Arc::clone(&limiter),
        );

        Ok(Self {
            commands,
            limiter,
            validator: SignatureValidator::new(clock),
            metrics,
            config,
        })
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Signed init data handed back by the web app.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub init_data: String,
}

/// Verification result; the failure reason is never disclosed.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/webhook", post(webhook));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    let mut verify = Router::new().route("/webapp/verify", post(verify_web_app));
    if let Some(cors) = web_app_cors(&state.config.bot.web_app_url) {
        verify = verify.layer(cors);
    }

    app.merge(verify)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy letting the web app's origin call the verify endpoint.
fn web_app_cors(web_app_url: &str) -> Option<CorsLayer> {
    let origin = Url::parse(web_app_url).ok()?.origin().ascii_serialization();
    let origin = HeaderValue::from_str(&origin).ok()?;

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods([Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "chat-gatekeeper",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Platform update webhook.
///
/// The secret header is checked before the body is parsed. Non-command
/// updates are acknowledged with an empty `200` and never reach the
/// admission pipeline.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(expected) = &state.config.bot.webhook_secret {
        let provided = headers
            .get(WEBHOOK_SECRET_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();

        if !bool::from(provided.ct_eq(expected.expose().as_bytes())) {
            state.metrics.record_rejection(ErrorKind::AuthenticityFailure);
            warn!(reason = %ErrorKind::AuthenticityFailure, "Webhook secret mismatch");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(err) => {
            debug!(error = %err, "Malformed update rejected");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let update_id = update.update_id;
    let Some(event) = InboundEvent::from_update(update) else {
        debug!(update_id, "Update without message acknowledged");
        return StatusCode::OK.into_response();
    };

    if event.command.is_none() {
        debug!(update_id, "Non-command message acknowledged");
        return StatusCode::OK.into_response();
    }

    match state.commands.dispatch(&event).await {
        Some(reply) => (StatusCode::OK, Json(reply.to_webhook_json())).into_response(),
        None => StatusCode::OK.into_response(),
    }
}

/// Verify signed init data from the companion web app.
pub async fn verify_web_app(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyRequest>,
) -> Json<VerifyResponse> {
    let payload = parse_init_data(&req.init_data);
    let valid = state
        .validator
        .validate(&payload, state.config.bot.token.expose());

    if valid {
        debug!("Web app init data verified");
    } else {
        state.metrics.record_rejection(ErrorKind::AuthenticityFailure);
        info!(reason = %ErrorKind::AuthenticityFailure, "Web app init data rejected");
    }

    Json(VerifyResponse { valid })
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            warn!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
