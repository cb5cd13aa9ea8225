// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for attack simulation.

use chat_gatekeeper::event::{parse_command, Identity, InboundEvent};
use std::collections::HashMap;

use super::attacks::Payload;

/// Generate a pool of distinct sender identities.
pub fn generate_users(count: usize) -> Vec<Identity> {
    (0..count)
        .map(|i| Identity::User(10_000 + i as i64))
        .collect()
}

/// Keyword payloads the default sanitizer must catch, in mixed case.
pub fn generate_injections() -> Vec<&'static str> {
    vec![
        "<script>alert(1)</script>",
        "JavaScript:void(0)",
        "eval(atob('x'))",
        "new Function('return 1')",
        "ALERT(document.cookie)",
        "<ScRiPt src=//evil>",
    ]
}

/// Text for one simulated message.
pub fn message_text(payload: Payload, index: usize, max_length: usize) -> String {
    match payload {
        Payload::Command | Payload::Anonymous => "/menu".to_string(),
        Payload::Injection => {
            let injections = generate_injections();
            format!("/start {}", injections[index % injections.len()])
        }
        Payload::Oversized => format!("/start {}", "a".repeat(max_length + index + 1)),
    }
}

/// Build the inbound event a webhook update would produce.
pub fn event(identity: Identity, text: &str) -> InboundEvent {
    InboundEvent {
        identity,
        username: None,
        chat_id: 42,
        text: Some(text.to_string()),
        command: parse_command(text),
    }
}

/// Init-data field sets with a given `auth_date`.
pub fn init_data_fields(auth_date: i64) -> HashMap<String, String> {
    HashMap::from([
        ("auth_date".to_string(), auth_date.to_string()),
        ("query_id".to_string(), "AAHdF6IQAAAAAN0XohDhrOrc".to_string()),
        (
            "user".to_string(),
            r#"{"id":279058397,"first_name":"Vlad"}"#.to_string(),
        ),
    ])
}

/// Hash values an attacker might try without the token.
pub fn generate_forged_hashes() -> Vec<String> {
    vec![
        String::new(),
        "0".repeat(64),
        "f".repeat(64),
        "not-hex".to_string(),
        "A".repeat(64),
        "00".repeat(31),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_users() {
        let users = generate_users(256);
        let unique: std::collections::HashSet<_> = users.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_oversized_exceeds_limit() {
        let text = message_text(Payload::Oversized, 0, 10);
        assert!(text.chars().count() > 10);
    }
}
