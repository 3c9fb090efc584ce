use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised anywhere below the dispatcher boundary.
///
/// None of these escape `Dispatcher::execute`; they are normalized into a
/// soft-failure envelope.
#[derive(Debug, Error)]
pub enum MetabaseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),

    /// Upstream answered with a status outside 2xx.
    /// `data` holds the parsed error body when it was JSON.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl MetabaseError {
    /// Best-effort human-readable message: the nested `data.message` of an
    /// upstream error body, then the error's own message.
    pub fn upstream_message(&self) -> String {
        if let Self::Api { data: Some(data), .. } = self {
            if let Some(nested) = data.get("message").and_then(|m| m.as_str()) {
                if !nested.is_empty() {
                    return nested.to_string();
                }
            }
        }
        let message = self.to_string();
        if message.is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message
        }
    }
}

const UNKNOWN_ERROR: &str = "Unknown error";

pub type MetabaseResult<T> = Result<T, MetabaseError>;

/// Machine-readable error kinds surfaced to the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InternalError,
    InvalidRequest,
    InvalidParams,
    MethodNotFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InternalError => "internal_error",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidParams => "invalid_params",
            Self::MethodNotFound => "method_not_found",
        }
    }
}

/// Argument problem detected before any network I/O.
///
/// This is the only error `Dispatcher::execute` returns; callers translate it
/// into their own protocol-level error response.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct ValidationError {
    pub code: ErrorCode,
    pub message: String,
}

impl ValidationError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidParams,
            message: message.into(),
        }
    }
}
