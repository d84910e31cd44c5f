use serde::{Deserialize, Serialize};
use shared::{
    asm::{AsmRole, AsmState, UnknownAsmState},
    error::ApiError,
};
use thiserror::Error;

use crate::action::Operation;

/// The request never produced a well-formed response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

/// Failure recorded against an operation after a FAIL or NETWORK_FAIL event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum SyncError {
    #[error("server rejected request: {0}")]
    Application(ApiError),
    #[error("server unreachable: {0}")]
    Transport(String),
}

impl SyncError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}

/// A response that the client cannot mirror. These are surfaced as view
/// faults instead of being applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("unknown {role:?} ASM state '{value}'")]
    UnknownAsmState { role: AsmRole, value: String },
    #[error("state {state} does not belong to the {role:?} machine")]
    RoleMismatch { role: AsmRole, state: AsmState },
    #[error("malformed {operation} body: {reason}")]
    MalformedBody {
        operation: Operation,
        reason: String,
    },
}

impl From<UnknownAsmState> for InvariantError {
    fn from(value: UnknownAsmState) -> Self {
        InvariantError::UnknownAsmState {
            role: value.role,
            value: value.value,
        }
    }
}
