use crate::envelope::ValidationError;

/// Failure categories the orchestrator and server branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Configuration,
    EmptyResult,
    Service,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Configuration(String),

    #[error("Empty response from AI model")]
    EmptyResponse,

    #[error("{message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ChatError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ChatError::Configuration(message.into())
    }

    pub fn service(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        ChatError::Service {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::Validation(_) => ErrorKind::Validation,
            ChatError::Configuration(_) => ErrorKind::Configuration,
            ChatError::EmptyResponse => ErrorKind::EmptyResult,
            ChatError::Service { .. } => ErrorKind::Service,
            ChatError::Transport(_) | ChatError::Decode(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status and machine-readable code for the error envelope.
    pub fn status_and_code(&self) -> (u16, String) {
        match self {
            ChatError::Validation(err) => (400, err.code().to_string()),
            ChatError::Configuration(_) => (500, "CONFIGURATION_ERROR".to_string()),
            ChatError::Service { status, code, .. } => (*status, code.clone()),
            ChatError::EmptyResponse | ChatError::Transport(_) | ChatError::Decode(_) => {
                (500, "INTERNAL_ERROR".to_string())
            }
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_codes() {
        let err = ChatError::from(ValidationError::InvalidBody);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status_and_code(), (400, "INVALID_REQUEST".to_string()));

        let err = ChatError::configuration("API key not configured");
        assert_eq!(err.status_and_code().0, 500);
        assert_eq!(err.to_string(), "API key not configured");

        let err = ChatError::service(429, "RESOURCE_EXHAUSTED", "quota");
        assert_eq!(err.kind(), ErrorKind::Service);
        assert_eq!(err.status_and_code(), (429, "RESOURCE_EXHAUSTED".to_string()));

        assert_eq!(ChatError::EmptyResponse.kind(), ErrorKind::EmptyResult);
        assert_eq!(
            ChatError::EmptyResponse.to_string(),
            "Empty response from AI model"
        );
    }
}
