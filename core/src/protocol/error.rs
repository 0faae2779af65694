use std::fmt;

use cipherscreen_engine::{EngineError, RequestId};
use cipherscreen_identity::Identity;
use thiserror::Error;

/// Role a caller must hold for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrator,
    Participant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Administrator => f.write_str("administrator"),
            Role::Participant => f.write_str("participant"),
        }
    }
}

/// Every way a protocol operation can be rejected. A rejected operation
/// leaves no partial state behind.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{caller} is not an admitted {role}")]
    Unauthorized { caller: Identity, role: Role },

    #[error("caller is not the submitter of transaction {0}")]
    Forbidden(u64),

    #[error("transaction {0} not found")]
    NotFound(u64),

    #[error("threshold not configured")]
    ThresholdNotConfigured,

    #[error("transaction {0} already disclosed")]
    AlreadyDisclosed(u64),

    #[error("disclosure already requested for transaction {0}")]
    DisclosurePending(u64),

    #[error("no outstanding disclosure request {0}")]
    UnknownRequest(RequestId),

    #[error("disclosure proof rejected for request {0}")]
    InvalidProof(RequestId),

    #[error("disclosed cleartext for request {0} is not a boolean")]
    MalformedCleartext(RequestId),

    #[error("administrator set cannot become empty")]
    LastAdministrator,

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl ProtocolError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::Unauthorized { .. } => "UNAUTHORIZED",
            ProtocolError::Forbidden(_) => "FORBIDDEN",
            ProtocolError::NotFound(_) => "NOT_FOUND",
            ProtocolError::ThresholdNotConfigured => "THRESHOLD_NOT_CONFIGURED",
            ProtocolError::AlreadyDisclosed(_) => "ALREADY_DISCLOSED",
            ProtocolError::DisclosurePending(_) => "DISCLOSURE_PENDING",
            ProtocolError::UnknownRequest(_) => "UNKNOWN_REQUEST",
            ProtocolError::InvalidProof(_) => "INVALID_PROOF",
            ProtocolError::MalformedCleartext(_) => "MALFORMED_CLEARTEXT",
            ProtocolError::LastAdministrator => "LAST_ADMINISTRATOR",
            ProtocolError::Engine(_) => "ENGINE_ERROR",
        }
    }

    /// Whether the engine may resend the same disclosure. The request slot
    /// stays outstanding for these.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidProof(_) | ProtocolError::MalformedCleartext(_)
        )
    }
}
