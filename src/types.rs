use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

/// A file attached to a message. `url` is either a base64 data URL or an
/// opaque reference that never leaves the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub mime_type: String,
    pub url: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

/// Caller-supplied part of a message; the store fills in id and timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    pub attachments: Option<Vec<Attachment>>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachments: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attachments: None,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = if attachments.is_empty() {
            None
        } else {
            Some(attachments)
        };
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Normal,
    Voice,
    Search,
    Attach,
}

impl InputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Normal => "normal",
            InputMode::Voice => "voice",
            InputMode::Search => "search",
            InputMode::Attach => "attach",
        }
    }

    /// Unknown names fall back to `Normal`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "voice" => InputMode::Voice,
            "search" => InputMode::Search,
            "attach" => InputMode::Attach,
            _ => InputMode::Normal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}
