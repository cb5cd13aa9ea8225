// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Inbound platform updates and the event handed to the admission layer.

use serde::Deserialize;
use std::fmt;

/// Caller identity used as the rate-limit and authorization key.
///
/// Updates without a sender map to [`Identity::Anonymous`], which has its
/// own bucket and can never collide with a real user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    User(i64),
    Anonymous,
}

impl Identity {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Identity::User(id) => Some(*id),
            Identity::Anonymous => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::User(id) => write!(f, "user:{id}"),
            Identity::Anonymous => f.write_str("anonymous"),
        }
    }
}

/// Platform update as delivered to the webhook. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Event seen by the admission pipeline and command handlers.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub identity: Identity,
    pub username: Option<String>,
    pub chat_id: i64,
    /// Raw message text, if any
    pub text: Option<String>,
    /// Bot command name without the leading slash or `@bot` suffix
    pub command: Option<String>,
}

impl InboundEvent {
    /// Build an event from a message update; `None` for updates without
    /// a message.
    pub fn from_update(update: Update) -> Option<Self> {
        let message = update.message?;
        let identity = message
            .from
            .as_ref()
            .map(|u| Identity::User(u.id))
            .unwrap_or(Identity::Anonymous);
        let command = message.text.as_deref().and_then(parse_command);

        Some(Self {
            identity,
            username: message.from.and_then(|u| u.username),
            chat_id: message.chat.id,
            text: message.text,
            command,
        })
    }
}

/// Extract the command name from `/name`, `/name@bot` or `/name args`.
pub fn parse_command(text: &str) -> Option<String> {
    let first = text.trim_start().split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(name.to_ascii_lowercase())
}
