//! Disclosure Coordinator
//!
//! Per-transaction disclosure lifecycle:
//!
//! ```text
//! ┌───────────┐  request_disclosure  ┌───────────┐  verified callback  ┌───────────┐
//! │ NoRequest │─────────────────────▶│ Requested │────────────────────▶│ Disclosed │
//! └───────────┘   (submitter only)   └───────────┘                     └───────────┘
//!                                      │      ▲
//!                                      └──────┘ InvalidProof: slot kept for retry
//! ```
//!
//! `Disclosed` is terminal. A request id is consumed by the callback that
//! commits it, so a replayed callback finds nothing and fails as unknown.

use std::collections::{BTreeMap, HashMap};

use cipherscreen_engine::RequestId;
use serde::{Deserialize, Serialize};

use super::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisclosureState {
    NoRequest,
    Requested { request_id: RequestId },
    Disclosed { value: bool },
}

/// An outstanding request to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureRequest {
    pub request_id: RequestId,
    pub transaction_id: u64,
    pub requested_at: u64,
}

/// Write-once plaintext result for a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosedResult {
    pub transaction_id: u64,
    pub value: bool,
    pub disclosed_at: u64,
}

#[derive(Debug, Default)]
pub struct DecryptionCoordinator {
    /// Outstanding requests by engine handle
    outstanding: HashMap<RequestId, DisclosureRequest>,
    /// Transaction -> its outstanding request
    by_transaction: HashMap<u64, RequestId>,
    results: BTreeMap<u64, DisclosedResult>,
}

impl DecryptionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of an existing transaction
    pub fn state(&self, transaction_id: u64) -> DisclosureState {
        if let Some(result) = self.results.get(&transaction_id) {
            return DisclosureState::Disclosed {
                value: result.value,
            };
        }
        match self.by_transaction.get(&transaction_id) {
            Some(request_id) => DisclosureState::Requested {
                request_id: *request_id,
            },
            None => DisclosureState::NoRequest,
        }
    }

    /// Only `NoRequest` may move to `Requested`.
    pub(crate) fn ensure_requestable(&self, transaction_id: u64) -> Result<(), ProtocolError> {
        match self.state(transaction_id) {
            DisclosureState::NoRequest => Ok(()),
            DisclosureState::Requested { .. } => {
                Err(ProtocolError::DisclosurePending(transaction_id))
            }
            DisclosureState::Disclosed { .. } => {
                Err(ProtocolError::AlreadyDisclosed(transaction_id))
            }
        }
    }

    pub(crate) fn record_request(&mut self, request: DisclosureRequest) {
        self.by_transaction
            .insert(request.transaction_id, request.request_id);
        self.outstanding.insert(request.request_id, request);
    }

    /// Finds the transaction bound to an outstanding request.
    pub(crate) fn resolve(&self, request_id: &RequestId) -> Result<u64, ProtocolError> {
        let request = self
            .outstanding
            .get(request_id)
            .ok_or(ProtocolError::UnknownRequest(*request_id))?;

        if self.results.contains_key(&request.transaction_id) {
            return Err(ProtocolError::AlreadyDisclosed(request.transaction_id));
        }
        Ok(request.transaction_id)
    }

    /// Consumes the request and stores the result. Callers must have
    /// resolved `request_id` first.
    pub(crate) fn commit(
        &mut self,
        request_id: &RequestId,
        value: bool,
        disclosed_at: u64,
    ) -> Result<DisclosedResult, ProtocolError> {
        let request = self
            .outstanding
            .remove(request_id)
            .ok_or(ProtocolError::UnknownRequest(*request_id))?;
        self.by_transaction.remove(&request.transaction_id);

        let result = DisclosedResult {
            transaction_id: request.transaction_id,
            value,
            disclosed_at,
        };
        self.results.insert(request.transaction_id, result.clone());
        Ok(result)
    }

    pub fn result(&self, transaction_id: u64) -> Option<&DisclosedResult> {
        self.results.get(&transaction_id)
    }

    pub fn outstanding(&self) -> impl Iterator<Item = &DisclosureRequest> {
        self.outstanding.values()
    }
}

/// Boolean cleartexts are exactly one byte, `0x00` or `0x01`.
pub fn decode_bool(cleartext: &[u8]) -> Option<bool> {
    match cleartext {
        [0] => Some(false),
        [1] => Some(true),
        _ => None,
    }
}
