//! Conversion of stored messages into the model's turn history.

use serde::{Deserialize, Serialize};

use crate::attachments::{InlineImage, validate_for_transport};
use crate::types::{Attachment, Message, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// One unit of a turn's payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineImage,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            Part::InlineData { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

/// Anything that can be replayed as a conversation turn.
pub trait TurnSource {
    fn role(&self) -> Role;
    fn content(&self) -> &str;
    fn attachments(&self) -> &[Attachment];
}

impl TurnSource for Message {
    fn role(&self) -> Role {
        self.role
    }

    fn content(&self) -> &str {
        &self.content
    }

    fn attachments(&self) -> &[Attachment] {
        self.attachments.as_deref().unwrap_or_default()
    }
}

/// The text part (always present, possibly empty), then any transportable
/// images.
pub fn turn_parts<T: TurnSource>(message: &T) -> Vec<Part> {
    let mut parts = vec![Part::text(message.content())];
    parts.extend(
        validate_for_transport(message.attachments())
            .into_iter()
            .map(|inline_data| Part::InlineData { inline_data }),
    );
    parts
}

/// History for every message before the in-flight (last) one. System turns
/// are skipped, as is any turn left without parts.
pub fn format_history<T: TurnSource>(conversation: &[T]) -> Vec<Turn> {
    let Some((_in_flight, prior)) = conversation.split_last() else {
        return Vec::new();
    };

    prior
        .iter()
        .filter(|message| message.role() != Role::System)
        .filter_map(|message| {
            let parts = turn_parts(message);
            if parts.is_empty() {
                return None;
            }
            let role = match message.role() {
                Role::User => TurnRole::User,
                _ => TurnRole::Model,
            };
            Some(Turn { role, parts })
        })
        .collect()
}
