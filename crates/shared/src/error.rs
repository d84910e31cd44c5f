use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    Unauthorized,
    /// Also returned when the server rejects an event that is illegal in the
    /// current ASM state.
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorCode::Validation,
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            409 => ErrorCode::Conflict,
            _ => ErrorCode::Internal,
        }
    }
}

/// Error body returned by the audit server: `{"result": "<message>"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerErrorBody {
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?} ({status}): {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            status,
            message: message.into(),
        }
    }

    /// Builds the error from a non-success response. Bodies that do not carry
    /// a `result` message fall back to the raw JSON text.
    pub fn from_response(status: u16, body: &serde_json::Value) -> Self {
        match serde_json::from_value::<ServerErrorBody>(body.clone()) {
            Ok(parsed) => Self::new(status, parsed.result),
            Err(_) if body.is_null() => Self::new(status, format!("HTTP {status}")),
            Err(_) => Self::new(status, body.to_string()),
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        self.code == ErrorCode::Unauthorized
    }
}
