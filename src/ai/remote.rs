use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{ChatError, ChatResult, Generate, GenerateRequest, Search, Transcribe};
use crate::attachments::to_data_url;
use crate::envelope::{
    ChatFailure, ChatRequest, ChatSuccess, SearchRequest, SearchResponse, VoiceResponse,
    WireMessage,
};
use crate::history::{Part, TurnRole};
use crate::types::{Attachment, Role, SearchResult};

/// Client for the `/chat`, `/search` and `/voice` endpoints of `orhen serve`
pub struct RemoteBackend {
    client: Client,
    base_url: String,
}

impl RemoteBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Rebuild an envelope message from model parts. Text parts are joined with
/// newlines; inline images become data-URL attachments.
fn wire_message(role: Role, parts: &[Part]) -> WireMessage {
    let mut texts = Vec::new();
    let mut attachments = Vec::new();
    for part in parts {
        match part {
            Part::Text { text } => texts.push(text.as_str()),
            Part::InlineData { inline_data } => attachments.push(Attachment {
                mime_type: inline_data.mime_type.clone(),
                url: to_data_url(inline_data),
                name: format!("attachment-{}", attachments.len() + 1),
            }),
        }
    }
    WireMessage {
        role,
        content: texts.join("\n"),
        attachments,
    }
}

fn wire_messages(request: &GenerateRequest) -> Vec<WireMessage> {
    let mut messages: Vec<WireMessage> = request
        .history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                TurnRole::User => Role::User,
                TurnRole::Model => Role::Assistant,
            };
            wire_message(role, &turn.parts)
        })
        .collect();
    messages.push(wire_message(Role::User, &request.parts));
    messages
}

fn failure_from_body(status: u16, body: &str, fallback: &str) -> ChatError {
    match serde_json::from_str::<ChatFailure>(body) {
        Ok(failure) => {
            let code = if failure.code.is_empty() {
                "SERVICE_ERROR".to_string()
            } else {
                failure.code
            };
            ChatError::service(status, code, failure.error)
        }
        Err(_) => ChatError::service(status, "SERVICE_ERROR", fallback),
    }
}

#[async_trait]
impl Generate for RemoteBackend {
    async fn generate(&self, request: &GenerateRequest) -> ChatResult<String> {
        let messages = wire_messages(request);
        debug!(messages = messages.len(), mode = request.mode.as_str(), "posting chat request");

        let response = self
            .client
            .post(self.url("/chat"))
            .json(&ChatRequest {
                messages: &messages,
                mode: request.mode.as_str(),
                instructions: request.instructions.as_ref(),
            })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(failure_from_body(
                status.as_u16(),
                &body,
                "Failed to send message",
            ));
        }

        let success: ChatSuccess = serde_json::from_str(&body)?;
        if success.text.trim().is_empty() {
            return Err(ChatError::EmptyResponse);
        }
        Ok(success.text)
    }
}

#[async_trait]
impl Search for RemoteBackend {
    async fn search(&self, query: &str) -> ChatResult<Vec<SearchResult>> {
        let response = self
            .client
            .post(self.url("/search"))
            .json(&SearchRequest {
                query: query.to_string(),
            })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(failure_from_body(
                status.as_u16(),
                &body,
                "Failed to process search",
            ));
        }
        let parsed: SearchResponse = serde_json::from_str(&body)?;
        Ok(parsed.results)
    }
}

#[async_trait]
impl Transcribe for RemoteBackend {
    async fn transcribe(&self, audio: Vec<u8>) -> ChatResult<String> {
        let response = self
            .client
            .post(self.url("/voice"))
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(audio)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(failure_from_body(
                status.as_u16(),
                &body,
                "Failed to process voice input",
            ));
        }
        let parsed: VoiceResponse = serde_json::from_str(&body)?;
        Ok(parsed.text)
    }
}
