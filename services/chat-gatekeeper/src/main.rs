// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Chat Gatekeeper Service
//!
//! Webhook front end for a chat bot. Every command is admitted through
//! rate limiting and sanitization before its handler runs.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! read first if present):
//!
//! - `BOT_TOKEN`: bot credential, also the signing secret (required)
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `WEB_APP_URL`: companion web app opened from buttons
//! - `MAX_REQUESTS_PER_WINDOW`: quota per identity (default: 100)
//! - `RATE_LIMIT_WINDOW_SECS`: sliding window (default: 3600)
//! - `BLOCK_EXPIRY_SECS`: lift blocks after this long (default: never)
//! - `MAX_MESSAGE_LENGTH`: characters (default: 1000)
//! - `BLOCKED_KEYWORDS`, `ADMIN_IDS`, `ALLOWED_DOMAINS`: comma lists
//! - `WEBHOOK_SECRET`: expected webhook secret header

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chat_gatekeeper::{
    clock::SystemClock,
    commands::StatusReport,
    config::Config,
    handlers::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        max_requests_per_window = config.rate_limit.max_requests_per_window,
        window_secs = config.rate_limit.window_secs,
        block_expiry_secs = ?config.rate_limit.block_expiry_secs,
        max_message_length = config.sanitizer.max_message_length,
        admins = config.access.admin_ids.len(),
        "Starting chat gatekeeper"
    );

    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState::build(config, Arc::new(SystemClock))?);

    let report = StatusReport::collect(&state.limiter).await;
    info!(
        total_requests = report.total_requests,
        blocked_identities = report.blocked_identities,
        window_secs = report.window_secs,
        max_requests_per_window = report.max_requests_per_window,
        "Security status at startup"
    );

    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
