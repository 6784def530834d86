use thiserror::Error;

use crate::flows::FlowTransitionError;
use crate::verify::DiscrepancyKind;

/// The HTTP call never produced a response. Status codes are never errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to `{url}` could not be delivered: {message}")]
    Unreachable { url: String, message: String },
    #[error("request to `{url}` timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },
    #[error("request to `{url}` could not be built: {message}")]
    InvalidRequest { url: String, message: String },
    #[error("response body from `{url}` could not be read: {message}")]
    Body { url: String, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle query failed: {0}")]
    Query(String),
    #[error("oracle row could not be decoded: {0}")]
    Decode(String),
}

/// Failures that end a scenario before its verification can complete.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HarnessError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Flow(#[from] FlowTransitionError),
}

impl HarnessError {
    pub fn kind(&self) -> DiscrepancyKind {
        match self {
            Self::Transport(_) => DiscrepancyKind::Transport,
            Self::Oracle(_) => DiscrepancyKind::Oracle,
            Self::Flow(_) => DiscrepancyKind::Internal,
        }
    }
}
