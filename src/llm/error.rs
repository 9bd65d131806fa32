//! Inference error types

use thiserror::Error;

/// Environment variable holding the endpoint credential
pub const API_KEY_ENV_VAR: &str = "GROQ_API_KEY";

/// Inference error with classification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct InferenceError {
    pub kind: InferenceErrorKind,
    pub message: String,
}

impl InferenceError {
    pub fn new(kind: InferenceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_credential() -> Self {
        Self::new(
            InferenceErrorKind::MissingCredential,
            format!("{API_KEY_ENV_VAR} is not set"),
        )
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(InferenceErrorKind::AuthenticationFailure, message)
    }

    pub fn model_unavailable(message: impl Into<String>) -> Self {
        Self::new(InferenceErrorKind::ModelUnavailable, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(InferenceErrorKind::TransportError, message)
    }

    pub fn unclassified(message: impl Into<String>) -> Self {
        Self::new(InferenceErrorKind::UnclassifiedFailure, message)
    }

    /// Text written into the assistant slot when a turn fails.
    pub fn user_message(&self, model: &str) -> String {
        match self.kind {
            InferenceErrorKind::MissingCredential => missing_credential_message(),
            InferenceErrorKind::AuthenticationFailure => format!(
                "API Error: {}\nPlease check if your {API_KEY_ENV_VAR} is correct and has permissions.",
                self.message
            ),
            InferenceErrorKind::ModelUnavailable => format!(
                "API Error: {}\nThe model '{model}' might not be available. \
                 Please check the model name and your account.",
                self.message
            ),
            InferenceErrorKind::TransportError => {
                format!("Network error while contacting the model: {}", self.message)
            }
            InferenceErrorKind::UnclassifiedFailure => {
                format!("An unexpected error occurred: {}", self.message)
            }
        }
    }
}

/// Fixed reply recorded when no credential is configured
pub fn missing_credential_message() -> String {
    format!(
        "Error: {API_KEY_ENV_VAR} environment variable not set. \
         Please set it and restart the application."
    )
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceErrorKind {
    /// No API key available; no request is attempted
    MissingCredential,
    /// Key rejected by the endpoint (401, 403)
    AuthenticationFailure,
    /// Unknown or unsupported model identifier
    ModelUnavailable,
    /// Network issues, timeouts, truncated bodies
    TransportError,
    /// Anything else
    UnclassifiedFailure,
}

impl InferenceErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::AuthenticationFailure => "authentication_failure",
            Self::ModelUnavailable => "model_unavailable",
            Self::TransportError => "transport_error",
            Self::UnclassifiedFailure => "unclassified_failure",
        }
    }
}

/// Classify a non-success HTTP response.
///
/// `code` and `message` come from the provider's `{"error": {...}}` body when
/// it parses; otherwise `message` is the raw body.
pub fn classify_http_error(status: u16, code: Option<&str>, message: &str) -> InferenceError {
    let lower = message.to_lowercase();

    if status == 401 || status == 403 {
        return InferenceError::auth(format!("Authentication failed: {message}"));
    }
    if code == Some("model_not_found")
        || status == 404
        || (lower.contains("model")
            && (lower.contains("not found") || lower.contains("does not exist")))
    {
        return InferenceError::model_unavailable(format!("Model not found: {message}"));
    }
    if code == Some("invalid_api_key") || lower.contains("api key") || lower.contains("authentication")
    {
        return InferenceError::auth(format!("Authentication failed: {message}"));
    }
    if status == 408 || status == 504 {
        return InferenceError::transport(format!("Gateway timeout: {message}"));
    }
    InferenceError::unclassified(format!("HTTP {status}: {message}"))
}

/// Classify a reqwest transport failure.
pub fn classify_transport_error(e: &reqwest::Error) -> InferenceError {
    if e.is_timeout() {
        InferenceError::transport(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        InferenceError::transport(format!("Connection failed: {e}"))
    } else if e.is_body() || e.is_decode() {
        InferenceError::transport(format!("Failed to read response: {e}"))
    } else {
        InferenceError::unclassified(format!("Request failed: {e}"))
    }
}
