// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound replies and the fixed user-visible notices.
//!
//! A reply is returned in the webhook response body as a platform method
//! call, so no separate outbound client is needed.

use serde::Serialize;
use serde_json::{json, Value};

pub const RATE_LIMITED_NOTICE: &str = "⚠️ Too many requests. Please wait before trying again.";
pub const INVALID_INPUT_NOTICE: &str = "⚠️ Invalid message detected.";
pub const GENERIC_ERROR_NOTICE: &str = "❌ Something went wrong. Please try again.";
pub const ACCESS_DENIED_NOTICE: &str = "❌ Access denied.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
}

/// One inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Button {
    Url { text: String, url: String },
    WebApp { text: String, web_app: WebAppInfo },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebAppInfo {
    pub url: String,
}

impl Button {
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Button::Url {
            text: text.into(),
            url: url.into(),
        }
    }

    pub fn web_app(text: impl Into<String>, url: impl Into<String>) -> Self {
        Button::WebApp {
            text: text.into(),
            web_app: WebAppInfo { url: url.into() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    Text(String),
    Photo { photo: String, caption: String },
}

/// A reply to the chat the event came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat_id: i64,
    pub body: ReplyBody,
    pub parse_mode: Option<ParseMode>,
    pub keyboard: Vec<Vec<Button>>,
}

impl Reply {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            body: ReplyBody::Text(text.into()),
            parse_mode: None,
            keyboard: Vec::new(),
        }
    }

    pub fn photo(chat_id: i64, photo: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            chat_id,
            body: ReplyBody::Photo {
                photo: photo.into(),
                caption: caption.into(),
            },
            parse_mode: None,
            keyboard: Vec::new(),
        }
    }

    pub fn markdown(mut self) -> Self {
        self.parse_mode = Some(ParseMode::Markdown);
        self
    }

    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        if !row.is_empty() {
            self.keyboard.push(row);
        }
        self
    }

    /// Visible text of the reply (caption for photos).
    pub fn visible_text(&self) -> &str {
        match &self.body {
            ReplyBody::Text(text) => text,
            ReplyBody::Photo { caption, .. } => caption,
        }
    }

    /// Render as a platform method call for the webhook response.
    pub fn to_webhook_json(&self) -> Value {
        let mut value = match &self.body {
            ReplyBody::Text(text) => json!({
                "method": "sendMessage",
                "chat_id": self.chat_id,
                "text": text,
            }),
            ReplyBody::Photo { photo, caption } => json!({
                "method": "sendPhoto",
                "chat_id": self.chat_id,
                "photo": photo,
                "caption": caption,
            }),
        };

        if let Some(mode) = self.parse_mode {
            value["parse_mode"] = json!(mode);
        }
        if !self.keyboard.is_empty() {
            value["reply_markup"] = json!({ "inline_keyboard": self.keyboard });
        }
        value
    }
}
