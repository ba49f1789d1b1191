use thiserror::Error;

/// Error types that can occur when running prompts or driving a conversation.
#[derive(Debug, Error)]
pub enum PromptLayerError {
    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    HttpError(String),
    /// Authentication and authorization errors
    #[error("Auth error: {0}")]
    AuthError(String),
    /// Invalid request parameters or format
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Non-success status returned by the prompt service
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    /// API response parsing or format error
    #[error("Response format error: {message}. Raw response: {raw_response}")]
    ResponseFormatError {
        message: String,
        raw_response: String,
    },
    /// JSON serialization/deserialization errors
    #[error("JSON parse error: {0}")]
    JsonError(String),
    /// A tool result did not correlate with any pending tool call
    #[error("No pending tool call with id {tool_call_id}")]
    UnmatchedToolCall { tool_call_id: String },
    /// Configuration loading or validation error
    #[error("Config error: {0}")]
    Config(String),
    /// Retry attempts exceeded
    #[error("Retry attempts exceeded after {attempts} tries: {last_error}")]
    RetryExceeded { attempts: usize, last_error: String },
    /// Generic error
    #[error("Generic error: {0}")]
    Generic(String),
}

impl PromptLayerError {
    /// Builds a format error carrying the offending payload.
    pub fn malformed(message: impl Into<String>, raw_response: impl Into<String>) -> Self {
        PromptLayerError::ResponseFormatError {
            message: message.into(),
            raw_response: raw_response.into(),
        }
    }
}

/// Converts reqwest HTTP errors into PromptLayerErrors
impl From<reqwest::Error> for PromptLayerError {
    fn from(err: reqwest::Error) -> Self {
        PromptLayerError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for PromptLayerError {
    fn from(err: serde_json::Error) -> Self {
        PromptLayerError::JsonError(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}
