//! Screening Protocol
//!
//! The serialized state machine behind the node. Every mutating operation
//! takes `&mut self`, checks all of its preconditions first and only then
//! applies its effects, so a rejected call leaves nothing behind.
//!
//! ```text
//! submit ──▶ compare_gt(amount, threshold) ──▶ ledger.append ──▶ TransactionSubmitted
//! request_disclosure ──▶ engine.request_disclosure ──▶ Requested ──▶ DisclosureRequested
//! on_disclosure ──▶ verify_proof ──▶ decode ──▶ Disclosed ──▶ Disclosed event
//! ```

pub mod disclosure;
pub mod error;
pub mod events;
pub mod ledger;
pub mod registry;
pub mod threshold;

#[cfg(test)]
mod tests;

use std::time::{SystemTime, UNIX_EPOCH};

use cipherscreen_engine::{Ciphertext, EncryptedArithmetic, EncryptedBool, RequestId};
use cipherscreen_identity::Identity;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub use disclosure::{
    DecryptionCoordinator, DisclosedResult, DisclosureRequest, DisclosureState, decode_bool,
};
pub use error::{ProtocolError, Role};
pub use events::{EventJournal, ProtocolEvent, RecordedEvent};
pub use ledger::{EncryptedTransaction, TransactionLedger};
pub use registry::ParticipantRegistry;
pub use threshold::ThresholdStore;

/// Public view of a transaction: metadata plus disclosure state, no ciphertexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionView {
    pub id: u64,
    pub submitter: Identity,
    pub created_at: u64,
    pub disclosure: DisclosureState,
}

pub struct ScreeningLedger<E: EncryptedArithmetic> {
    engine: E,
    registry: ParticipantRegistry,
    threshold: ThresholdStore,
    ledger: TransactionLedger,
    coordinator: DecryptionCoordinator,
    journal: EventJournal,
}

impl<E: EncryptedArithmetic> ScreeningLedger<E> {
    pub fn new(
        engine: E,
        administrators: impl IntoIterator<Item = Identity>,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            engine,
            registry: ParticipantRegistry::new(administrators)?,
            threshold: ThresholdStore::new(),
            ledger: TransactionLedger::new(),
            coordinator: DecryptionCoordinator::new(),
            journal: EventJournal::new(),
        })
    }

    // ---- Participant registry ----

    /// Admitting an already admitted identity is a silent no-op.
    pub fn admit(&mut self, caller: &Identity, identity: Identity) -> Result<(), ProtocolError> {
        if self.registry.admit(caller, identity)? {
            self.journal
                .emit(ProtocolEvent::ParticipantAdmitted { identity });
        } else {
            debug!("{} already admitted", identity.short());
        }
        Ok(())
    }

    pub fn add_administrator(
        &mut self,
        caller: &Identity,
        identity: Identity,
    ) -> Result<(), ProtocolError> {
        if self.registry.add_administrator(caller, identity)? {
            self.journal
                .emit(ProtocolEvent::AdministratorAdded { identity });
        }
        Ok(())
    }

    pub fn remove_administrator(
        &mut self,
        caller: &Identity,
        identity: &Identity,
    ) -> Result<(), ProtocolError> {
        if self.registry.remove_administrator(caller, identity)? {
            self.journal.emit(ProtocolEvent::AdministratorRemoved {
                identity: *identity,
            });
        }
        Ok(())
    }

    pub fn is_admitted(&self, identity: &Identity) -> bool {
        self.registry.is_admitted(identity)
    }

    pub fn is_administrator(&self, identity: &Identity) -> bool {
        self.registry.is_administrator(identity)
    }

    // ---- Threshold store ----

    pub fn set_threshold(
        &mut self,
        caller: &Identity,
        ciphertext: Ciphertext,
    ) -> Result<(), ProtocolError> {
        self.registry.require(caller, Role::Administrator)?;
        self.threshold.replace(ciphertext);
        self.journal.emit(ProtocolEvent::ThresholdChanged);
        Ok(())
    }

    pub fn get_threshold(&self, caller: &Identity) -> Result<&Ciphertext, ProtocolError> {
        self.registry.require(caller, Role::Administrator)?;
        self.threshold.current()
    }

    // ---- Transaction ledger ----

    pub fn submit(
        &mut self,
        caller: &Identity,
        amount_ciphertext: Ciphertext,
    ) -> Result<u64, ProtocolError> {
        self.registry.require(caller, Role::Participant)?;
        let threshold = self.threshold.current()?;

        let suspicious = self.engine.compare_gt(&amount_ciphertext, threshold)?;

        let id = self
            .ledger
            .append(*caller, amount_ciphertext, suspicious, unix_now());
        self.journal.emit(ProtocolEvent::TransactionSubmitted {
            id,
            submitter: *caller,
        });
        Ok(id)
    }

    pub fn encrypted_flag(&self, id: u64) -> Result<&EncryptedBool, ProtocolError> {
        Ok(&self.ledger.get(id)?.suspicious_ciphertext)
    }

    pub fn encrypted_amount(&self, id: u64) -> Result<&Ciphertext, ProtocolError> {
        Ok(&self.ledger.get(id)?.amount_ciphertext)
    }

    pub fn transaction(&self, id: u64) -> Result<TransactionView, ProtocolError> {
        let tx = self.ledger.get(id)?;
        Ok(self.view(tx))
    }

    pub fn transactions_by(&self, submitter: &Identity) -> Vec<TransactionView> {
        self.ledger
            .by_submitter(submitter)
            .map(|tx| self.view(tx))
            .collect()
    }

    pub fn transaction_count(&self) -> u64 {
        self.ledger.len() as u64
    }

    fn view(&self, tx: &EncryptedTransaction) -> TransactionView {
        TransactionView {
            id: tx.id,
            submitter: tx.submitter,
            created_at: tx.created_at,
            disclosure: self.coordinator.state(tx.id),
        }
    }

    // ---- Disclosure ----

    /// Only the submitter may ask, once. Returns the engine's request handle.
    pub fn request_disclosure(
        &mut self,
        caller: &Identity,
        transaction_id: u64,
    ) -> Result<RequestId, ProtocolError> {
        let tx = self.ledger.get(transaction_id)?;
        if tx.submitter != *caller {
            return Err(ProtocolError::Forbidden(transaction_id));
        }
        self.coordinator.ensure_requestable(transaction_id)?;

        let request_id = self.engine.request_disclosure(&tx.suspicious_ciphertext)?;

        self.coordinator.record_request(DisclosureRequest {
            request_id,
            transaction_id,
            requested_at: unix_now(),
        });
        self.journal.emit(ProtocolEvent::DisclosureRequested {
            id: transaction_id,
        });
        Ok(request_id)
    }

    /// Engine callback. The caller is never consulted; only the proof is.
    pub fn on_disclosure(
        &mut self,
        request_id: &RequestId,
        cleartext: &[u8],
        proof: &[u8],
    ) -> Result<DisclosedResult, ProtocolError> {
        let transaction_id = self.coordinator.resolve(request_id)?;

        if !self.engine.verify_proof(request_id, cleartext, proof) {
            warn!(
                "rejected disclosure proof for transaction {} (request {:?})",
                transaction_id, request_id
            );
            return Err(ProtocolError::InvalidProof(*request_id));
        }

        let value =
            decode_bool(cleartext).ok_or(ProtocolError::MalformedCleartext(*request_id))?;

        let result = self.coordinator.commit(request_id, value, unix_now())?;
        self.journal.emit(ProtocolEvent::Disclosed {
            id: transaction_id,
            value,
        });
        Ok(result)
    }

    pub fn disclosure_status(&self, transaction_id: u64) -> Result<DisclosureState, ProtocolError> {
        self.ledger.get(transaction_id)?;
        Ok(self.coordinator.state(transaction_id))
    }

    /// `None` until the result has been disclosed.
    pub fn disclosed_result(&self, transaction_id: u64) -> Result<Option<bool>, ProtocolError> {
        self.ledger.get(transaction_id)?;
        Ok(self.coordinator.result(transaction_id).map(|r| r.value))
    }

    pub fn outstanding_requests(&self) -> Vec<DisclosureRequest> {
        self.coordinator.outstanding().cloned().collect()
    }

    // ---- Journal ----

    pub fn events(&self) -> &[RecordedEvent] {
        self.journal.all()
    }

    pub fn events_since(&self, after: u64) -> &[RecordedEvent] {
        self.journal.since(after)
    }

    pub fn last_event_seq(&self) -> u64 {
        self.journal.last_seq()
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
