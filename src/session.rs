//! In-memory chat sessions.
//!
//! A transcript is append-only and lives for the process lifetime; nothing
//! is persisted. The store is an explicit object owned by `AppState` and
//! passed into each turn's handler.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Marks an assistant message that reports a failed turn
    #[serde(default)]
    pub error: bool,
    pub at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            error: false,
            at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            error: false,
            at: Utc::now(),
        }
    }

    pub fn assistant_error(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            error: true,
            at: Utc::now(),
        }
    }
}

/// Session transcripts keyed by session id.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, creating the session on first use.
    pub fn append(&self, session_id: &str, message: ChatMessage) {
        let mut sessions = self.sessions.write();
        sessions
            .entry(session_id.to_string())
            .or_default()
            .push(message);
    }

    /// Snapshot of a session's transcript; empty for an unknown session.
    pub fn messages(&self, session_id: &str) -> Vec<ChatMessage> {
        let sessions = self.sessions.read();
        sessions.get(session_id).cloned().unwrap_or_default()
    }

    pub fn len(&self, session_id: &str) -> usize {
        let sessions = self.sessions.read();
        sessions.get(session_id).map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, session_id: &str) -> bool {
        self.len(session_id) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_read_back() {
        let store = SessionStore::new();
        store.append("s1", ChatMessage::user("open example.com"));
        store.append("s1", ChatMessage::assistant("done"));

        let messages = store.messages("s1");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert!(!messages[1].error);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.append("a", ChatMessage::user("hi"));
        assert_eq!(store.len("a"), 1);
        assert!(store.is_empty("b"));
    }

    #[test]
    fn test_error_append_preserves_prior_messages() {
        let store = SessionStore::new();
        store.append("s", ChatMessage::user("first"));
        store.append("s", ChatMessage::assistant("ok"));
        let before = store.messages("s");

        store.append(
            "s",
            ChatMessage::assistant_error("Error: Chrome did not start"),
        );

        let after = store.messages("s");
        assert_eq!(after.len(), before.len() + 1);
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.content, b.content);
        }
        let last = after.last().unwrap();
        assert!(last.error);
        assert!(last.content.contains("Chrome did not start"));
    }
}
