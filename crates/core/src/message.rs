//! Turn and Transcript domain types.
//!
//! A question flows through the system as a single user turn; the backend's
//! answer comes back as an assistant turn. Both are appended, as a pair, to
//! the transcript of the session that asked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Key of the process-wide session used when no caller identity is known.
    pub const ANONYMOUS: &'static str = "anonymous";

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking (the composed prompt is stored under this role)
    User,
    /// The LLM backend
    Assistant,
}

/// A single entry in a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,

    /// The text content
    pub content: String,

    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The ordered, append-only record of one conversation session.
///
/// Turns are only ever committed in user/assistant pairs, so a failed
/// backend call leaves no half-recorded exchange behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: SessionId,

    /// Ordered turns, oldest first
    pub turns: Vec<Turn>,

    pub created_at: DateTime<Utc>,

    /// When the last exchange was committed
    pub updated_at: DateTime<Utc>,
}

impl Transcript {
    /// Create a new empty transcript.
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Commit a completed exchange.
    pub fn push_exchange(&mut self, user: Turn, assistant: Turn) {
        self.updated_at = Utc::now();
        self.turns.push(user);
        self.turns.push(assistant);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent `limit` turns, or all of them when `limit` is zero.
    ///
    /// The window always starts on a user turn so the backend never sees a
    /// history that opens with an orphaned reply.
    pub fn recent(&self, limit: usize) -> &[Turn] {
        if limit == 0 || limit >= self.turns.len() {
            return &self.turns;
        }
        let mut start = self.turns.len() - limit;
        while start < self.turns.len() && self.turns[start].role != Role::User {
            start += 1;
        }
        &self.turns[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript_with(exchanges: usize) -> Transcript {
        let mut t = Transcript::new(SessionId::anonymous());
        for i in 0..exchanges {
            t.push_exchange(Turn::user(format!("q{i}")), Turn::assistant(format!("a{i}")));
        }
        t
    }

    #[test]
    fn create_user_turn() {
        let turn = Turn::user("Hello!");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, "Hello!");
    }

    #[test]
    fn exchange_appends_pair_in_order() {
        let mut t = Transcript::new(SessionId::from("visitor-1"));
        let created = t.created_at;
        t.push_exchange(Turn::user("q"), Turn::assistant("a"));

        assert_eq!(t.len(), 2);
        assert_eq!(t.turns[0].role, Role::User);
        assert_eq!(t.turns[1].role, Role::Assistant);
        assert!(t.updated_at >= created);
    }

    #[test]
    fn recent_zero_means_everything() {
        let t = transcript_with(3);
        assert_eq!(t.recent(0).len(), 6);
        assert_eq!(t.recent(100).len(), 6);
    }

    #[test]
    fn recent_window_starts_on_user_turn() {
        let t = transcript_with(3);
        // 3 turns would start on "a1"; the window skips forward to "q2".
        let window = t.recent(3);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "q2");
        assert_eq!(window[1].content, "a2");

        let window = t.recent(4);
        assert_eq!(window.len(), 4);
        assert_eq!(window[0].content, "q1");
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn anonymous_session_id() {
        assert_eq!(SessionId::anonymous().as_str(), "anonymous");
        assert_ne!(SessionId::anonymous(), SessionId::from("visitor-1"));
    }
}
