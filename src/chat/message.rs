//! Conversation message model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query strategy requested from the retrieval backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Query over tabular/structured sources.
    #[default]
    Structured,
    /// Query over document/unstructured sources.
    Unstructured,
}

impl QueryMode {
    /// The other mode.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Structured => Self::Unstructured,
            Self::Unstructured => Self::Structured,
        }
    }

    /// Wire name, as sent in `rag_type`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Unstructured => "unstructured",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names neither mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown query mode `{0}` (expected `structured` or `unstructured`)")]
pub struct ParseModeError(String);

impl FromStr for QueryMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structured" => Ok(Self::Structured),
            "unstructured" => Ok(Self::Unstructured),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the user.
    User,
    /// Streamed back from the retrieval service.
    Assistant,
}

/// One side of a turn.
///
/// Everything except `content` is fixed at creation. Assistant content starts
/// empty and only grows by appends, or is replaced wholesale by the error text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
    mode: QueryMode,
}

impl Message {
    /// A user message carrying already-trimmed text.
    #[must_use]
    pub fn user(content: impl Into<String>, mode: QueryMode) -> Self {
        Self::new(Role::User, content.into(), mode)
    }

    /// An empty assistant placeholder.
    #[must_use]
    pub fn assistant_placeholder(mode: QueryMode) -> Self {
        Self::new(Role::Assistant, String::new(), mode)
    }

    fn new(role: Role, content: String, mode: QueryMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
            mode,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Mode that was active when the message was created.
    #[must_use]
    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    pub(crate) fn append(&mut self, text: &str) {
        self.content.push_str(text);
    }

    pub(crate) fn replace_content(&mut self, text: impl Into<String>) {
        self.content = text.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_is_identity() {
        let mode = QueryMode::Unstructured;
        assert_eq!(mode.toggled(), QueryMode::Structured);
        assert_eq!(mode.toggled().toggled(), mode);
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(" Structured ".parse(), Ok(QueryMode::Structured));
        assert_eq!("UNSTRUCTURED".parse(), Ok(QueryMode::Unstructured));
        assert!("hybrid".parse::<QueryMode>().is_err());
    }

    #[test]
    fn test_message_serializes_lowercase_enums() {
        let msg = Message::user("revenue by region", QueryMode::Unstructured);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["mode"], "unstructured");
        assert_eq!(json["content"], "revenue by region");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Message::assistant_placeholder(QueryMode::Structured);
        let b = Message::assistant_placeholder(QueryMode::Structured);
        assert_ne!(a.id(), b.id());
        assert!(a.content().is_empty());
        assert_eq!(a.role(), Role::Assistant);
    }
}
