//! HTTP backend: `/chat`, `/search` and `/voice`.
//!
//! Every `/chat` outcome is a JSON envelope. Failures carry
//! `{error, code, timestamp, status: "error"}` with the status code taken from
//! [`ChatError::status_and_code`].

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::ai::{
    ChatError, ChatResult, DemoSearch, DemoTranscriber, GeminiClient, Generate, GenerateRequest,
    GenerationConfig, Search, Transcribe,
};
use crate::config::AppConfig;
use crate::envelope::{
    ChatFailure, ChatSuccess, EnvelopeStatus, SearchRequest, SearchResponse, ValidationError,
    VoiceResponse, validate_chat_request,
};
use crate::history::{format_history, turn_parts};
use crate::types::{InputMode, now_millis};

const CHAT_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate";

pub struct AppState {
    pub generator: Arc<dyn Generate>,
    pub search: Arc<dyn Search>,
    pub transcriber: Arc<dyn Transcribe>,
}

impl AppState {
    /// Gemini for generation, demo providers for search and voice.
    pub fn from_config(config: &AppConfig) -> Self {
        let gemini = GeminiClient::new(
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
            config.gemini_api_key.clone(),
        );
        if !gemini.has_credentials() {
            warn!("GEMINI_API_KEY is not set; /chat will answer with a configuration error");
        }
        Self {
            generator: Arc::new(gemini),
            search: Arc::new(DemoSearch),
            transcriber: Arc::new(DemoTranscriber),
        }
    }
}

/// `ChatError` rendered as the failure envelope.
pub struct ApiError(pub ChatError);

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError(ChatError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.0.status_and_code();
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(%code, "chat request failed: {}", self.0);
        } else {
            warn!(%code, "chat request rejected: {}", self.0);
        }

        let body = ChatFailure {
            error: self.0.to_string(),
            code,
            timestamp: now_millis(),
            status: EnvelopeStatus::Error,
        };
        (status, [(header::CACHE_CONTROL, "no-store")], Json(body)).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/search", post(search_handler))
        .route("/voice", post(voice_handler))
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to install Ctrl-C handler: {}", err);
        return;
    }
    info!("shutting down");
}

async fn chat_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match answer_chat(&state, &body).await {
        Ok(text) => (
            [(header::CACHE_CONTROL, CHAT_CACHE_CONTROL)],
            Json(ChatSuccess::markdown(text, now_millis())),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn answer_chat(state: &AppState, body: &[u8]) -> Result<String, ApiError> {
    let body: Value = serde_json::from_slice(body).map_err(|_| ValidationError::InvalidBody)?;
    let request = validate_chat_request(&body)?;

    let last = request
        .messages
        .last()
        .ok_or(ValidationError::MissingLastMessage)?;
    let generate = GenerateRequest {
        history: format_history(&request.messages),
        parts: turn_parts(last),
        config: GenerationConfig::default(),
        mode: InputMode::parse(&request.mode),
        instructions: request.instructions,
    };
    debug!(
        history = generate.history.len(),
        mode = generate.mode.as_str(),
        "forwarding chat request"
    );

    Ok(generate_text(state.generator.as_ref(), &generate).await?)
}

async fn generate_text(generator: &dyn Generate, request: &GenerateRequest) -> ChatResult<String> {
    let text = generator.generate(request).await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ChatError::EmptyResponse);
    }
    Ok(text.to_string())
}

async fn search_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let query = match serde_json::from_slice::<SearchRequest>(&body) {
        Ok(request) => request.query,
        Err(err) => {
            error!("error processing search: {}", err);
            return plain_failure("Failed to process search");
        }
    };
    match state.search.search(&query).await {
        Ok(results) => Json(SearchResponse { results }).into_response(),
        Err(err) => {
            error!("error processing search: {}", err);
            plain_failure("Failed to process search")
        }
    }
}

async fn voice_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match state.transcriber.transcribe(body.to_vec()).await {
        Ok(text) => Json(VoiceResponse { text }).into_response(),
        Err(err) => {
            error!("error processing voice input: {}", err);
            plain_failure("Failed to process voice input")
        }
    }
}

fn plain_failure(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}
