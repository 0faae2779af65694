//! API Types
//!
//! Request/response types for the HTTP API.
//!
//! Authenticated endpoints take a [`SignedCall`](cipherscreen_identity::SignedCall)
//! body; the structs below are what its `payload` decodes into. Payloads
//! reject unknown fields, and each endpoint checks the envelope's
//! [`operation`] name.

use cipherscreen_engine::{Ciphertext, EncryptedBool, RequestId};
use cipherscreen_identity::Identity;
use serde::{Deserialize, Serialize};

use crate::protocol::RecordedEvent;

// ============================================================================
// Operations
// ============================================================================

/// Operation names signed into every call envelope
pub mod operation {
    pub const ADMIT: &str = "admin.admit";
    pub const ADD_ADMINISTRATOR: &str = "admin.add_administrator";
    pub const REMOVE_ADMINISTRATOR: &str = "admin.remove_administrator";
    pub const SET_THRESHOLD: &str = "admin.set_threshold";
    pub const GET_THRESHOLD: &str = "admin.get_threshold";
    pub const SUBMIT: &str = "tx.submit";
    pub const REQUEST_DISCLOSURE: &str = "tx.request_disclosure";
}

// ============================================================================
// Governance
// ============================================================================

/// Payload for admitting a participant or adding/removing an administrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityPayload {
    pub identity: Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetThresholdPayload {
    pub ciphertext: Ciphertext,
}

/// Payload for calls that only need the caller's identity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmptyPayload {}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThresholdResponse {
    pub ciphertext: Ciphertext,
}

/// Acknowledgement for state changes with no other output
#[derive(Debug, Serialize, Deserialize)]
pub struct OperationResponse {
    pub accepted: bool,
    pub message: String,
}

impl OperationResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message: message.into(),
        }
    }
}

// ============================================================================
// Transactions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitPayload {
    pub amount_ciphertext: Ciphertext,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub transaction_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub submitter: Identity,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FlagResponse {
    pub transaction_id: u64,
    pub suspicious_ciphertext: EncryptedBool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AmountResponse {
    pub transaction_id: u64,
    pub amount_ciphertext: Ciphertext,
}

// ============================================================================
// Disclosure
// ============================================================================

/// Must name the same transaction as the request path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisclosurePayload {
    pub transaction_id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DisclosureResponse {
    pub transaction_id: u64,
    pub request_id: RequestId,
}

// ============================================================================
// Events & Health
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Only events with a larger sequence number
    #[serde(default)]
    pub since: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<RecordedEvent>,
    pub last_seq: u64,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub uptime_secs: u64,
    pub transactions: u64,
    pub outstanding_disclosures: usize,
}

// ============================================================================
// Error Response
// ============================================================================

/// Standard error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(msg, "BAD_REQUEST")
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(msg, "NOT_FOUND")
    }
}
