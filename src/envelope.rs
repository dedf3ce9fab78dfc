//! Wire contract for the chat, search and voice endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::history::TurnSource;
use crate::types::{Attachment, Role, SearchResult};

pub const FORMAT_MARKDOWN: &str = "markdown";

/// Malformed request bodies. Each variant maps to a 400 response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid request body format")]
    InvalidBody,

    #[error("Invalid messages format - each message must have content and valid role")]
    InvalidMessage { index: usize },

    #[error("Invalid message format")]
    MissingLastMessage,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidBody => "INVALID_REQUEST",
            ValidationError::InvalidMessage { .. } | ValidationError::MissingLastMessage => {
                "INVALID_MESSAGE"
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl TurnSource for WireMessage {
    fn role(&self) -> Role {
        self.role
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

/// Body of `POST /chat` as sent by the client.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub messages: &'a [WireMessage],
    pub mode: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<&'a Value>,
}

/// A chat request that passed shape validation. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedRequest {
    pub messages: Vec<WireMessage>,
    pub mode: String,
    pub instructions: Option<Value>,
}

/// Validate an untyped request body.
pub fn validate_chat_request(body: &Value) -> Result<ValidatedRequest, ValidationError> {
    let object = body.as_object().ok_or(ValidationError::InvalidBody)?;
    let raw_messages = object
        .get("messages")
        .and_then(Value::as_array)
        .ok_or(ValidationError::InvalidBody)?;

    let messages = raw_messages
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_message(raw).ok_or(ValidationError::InvalidMessage { index }))
        .collect::<Result<Vec<_>, _>>()?;

    if messages.is_empty() {
        return Err(ValidationError::MissingLastMessage);
    }

    let mode = object
        .get("mode")
        .and_then(Value::as_str)
        .unwrap_or("normal")
        .to_string();

    Ok(ValidatedRequest {
        messages,
        mode,
        instructions: object.get("instructions").filter(|v| !v.is_null()).cloned(),
    })
}

fn parse_message(raw: &Value) -> Option<WireMessage> {
    let object = raw.as_object()?;
    let content = object.get("content")?.as_str()?;
    let role = Role::parse(object.get("role")?.as_str()?)?;
    // Attachments are advisory; malformed ones are dropped rather than failing the turn.
    let attachments = object
        .get("attachments")
        .and_then(|value| serde_json::from_value::<Vec<Attachment>>(value.clone()).ok())
        .unwrap_or_default();
    Some(WireMessage {
        role,
        content: content.to_string(),
        attachments,
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSuccess {
    pub text: String,
    pub timestamp: i64,
    pub format: String,
    pub status: EnvelopeStatus,
}

impl ChatSuccess {
    pub fn markdown(text: String, timestamp: i64) -> Self {
        Self {
            text,
            timestamp,
            format: FORMAT_MARKDOWN.to_string(),
            status: EnvelopeStatus::Success,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFailure {
    pub error: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub timestamp: i64,
    pub status: EnvelopeStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoiceResponse {
    pub text: String,
}
