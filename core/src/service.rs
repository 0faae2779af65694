//! Ledger Service
//!
//! Thread-safe front for the screening ledger. One async mutex serializes
//! every operation, which gives the protocol its one-at-a-time execution
//! model; the HTTP handlers and the disclosure relay both go through here.
//!
//! After each committed operation the affected transaction views, results
//! and new journal entries are copied into the optional display mirror.

use std::sync::Arc;

use cipherscreen_engine::{Ciphertext, Disclosure, EncryptedArithmetic, EncryptedBool, RequestId};
use cipherscreen_identity::Identity;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::protocol::{
    DisclosedResult, DisclosureState, ProtocolError, RecordedEvent, ScreeningLedger,
    TransactionView,
};
use crate::storage::{StateMirror, event_key, result_key, transaction_key};

/// Counters for the health endpoint
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LedgerStats {
    pub transactions: u64,
    pub outstanding_disclosures: usize,
    pub events: u64,
}

pub struct LedgerService<E: EncryptedArithmetic> {
    inner: Arc<Mutex<ScreeningLedger<E>>>,
    mirror: Option<Arc<dyn StateMirror>>,
}

impl<E: EncryptedArithmetic> Clone for LedgerService<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            mirror: self.mirror.clone(),
        }
    }
}

impl<E: EncryptedArithmetic> LedgerService<E> {
    pub fn new(ledger: ScreeningLedger<E>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
            mirror: None,
        }
    }

    /// Mirror committed state into `mirror`
    pub fn with_mirror(mut self, mirror: Arc<dyn StateMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Runs `op` under the lock and mirrors the events it emitted.
    async fn mutate<R>(
        &self,
        op: impl FnOnce(&mut ScreeningLedger<E>) -> Result<R, ProtocolError>,
        touched: impl FnOnce(&R) -> Option<u64>,
    ) -> Result<R, ProtocolError> {
        let mut ledger = self.inner.lock().await;
        let mark = ledger.last_event_seq();

        let out = op(&mut *ledger)?;

        if let Some(mirror) = &self.mirror {
            if let Some(id) = touched(&out) {
                mirror_transaction(mirror.as_ref(), &ledger, id);
            }
            for recorded in ledger.events_since(mark) {
                put_json(mirror.as_ref(), &event_key(recorded.seq), recorded);
            }
        }
        Ok(out)
    }

    // ---- Governance ----

    pub async fn admit(&self, caller: Identity, identity: Identity) -> Result<(), ProtocolError> {
        self.mutate(|l| l.admit(&caller, identity), |_| None).await
    }

    pub async fn add_administrator(
        &self,
        caller: Identity,
        identity: Identity,
    ) -> Result<(), ProtocolError> {
        self.mutate(|l| l.add_administrator(&caller, identity), |_| None)
            .await
    }

    pub async fn remove_administrator(
        &self,
        caller: Identity,
        identity: Identity,
    ) -> Result<(), ProtocolError> {
        self.mutate(|l| l.remove_administrator(&caller, &identity), |_| None)
            .await
    }

    pub async fn set_threshold(
        &self,
        caller: Identity,
        ciphertext: Ciphertext,
    ) -> Result<(), ProtocolError> {
        self.mutate(|l| l.set_threshold(&caller, ciphertext), |_| None)
            .await?;
        info!("Threshold updated by {}", caller.short());
        Ok(())
    }

    pub async fn get_threshold(&self, caller: Identity) -> Result<Ciphertext, ProtocolError> {
        self.inner.lock().await.get_threshold(&caller).cloned()
    }

    // ---- Submission ----

    pub async fn submit(
        &self,
        caller: Identity,
        amount_ciphertext: Ciphertext,
    ) -> Result<u64, ProtocolError> {
        self.mutate(|l| l.submit(&caller, amount_ciphertext), |id| Some(*id))
            .await
    }

    // ---- Disclosure ----

    pub async fn request_disclosure(
        &self,
        caller: Identity,
        transaction_id: u64,
    ) -> Result<RequestId, ProtocolError> {
        self.mutate(
            |l| l.request_disclosure(&caller, transaction_id),
            |_| Some(transaction_id),
        )
        .await
    }

    /// Engine callback entry point.
    pub async fn deliver(&self, disclosure: Disclosure) -> Result<DisclosedResult, ProtocolError> {
        let result = self
            .mutate(
                |l| l.on_disclosure(&disclosure.request_id, &disclosure.cleartext, &disclosure.proof),
                |r| Some(r.transaction_id),
            )
            .await?;

        if let Some(mirror) = &self.mirror {
            put_json(mirror.as_ref(), &result_key(result.transaction_id), &result);
        }
        debug!("Committed disclosure for transaction {}", result.transaction_id);
        Ok(result)
    }

    // ---- Reads ----

    pub async fn transaction(&self, id: u64) -> Result<TransactionView, ProtocolError> {
        self.inner.lock().await.transaction(id)
    }

    pub async fn transactions_by(&self, submitter: Identity) -> Vec<TransactionView> {
        self.inner.lock().await.transactions_by(&submitter)
    }

    pub async fn encrypted_flag(&self, id: u64) -> Result<EncryptedBool, ProtocolError> {
        self.inner.lock().await.encrypted_flag(id).cloned()
    }

    pub async fn encrypted_amount(&self, id: u64) -> Result<Ciphertext, ProtocolError> {
        self.inner.lock().await.encrypted_amount(id).cloned()
    }

    pub async fn disclosure_status(&self, id: u64) -> Result<DisclosureState, ProtocolError> {
        self.inner.lock().await.disclosure_status(id)
    }

    pub async fn disclosed_result(&self, id: u64) -> Result<Option<bool>, ProtocolError> {
        self.inner.lock().await.disclosed_result(id)
    }

    pub async fn is_admitted(&self, identity: Identity) -> bool {
        self.inner.lock().await.is_admitted(&identity)
    }

    pub async fn is_administrator(&self, identity: Identity) -> bool {
        self.inner.lock().await.is_administrator(&identity)
    }

    pub async fn events_since(&self, after: u64) -> Vec<RecordedEvent> {
        self.inner.lock().await.events_since(after).to_vec()
    }

    pub async fn stats(&self) -> LedgerStats {
        let ledger = self.inner.lock().await;
        LedgerStats {
            transactions: ledger.transaction_count(),
            outstanding_disclosures: ledger.outstanding_requests().len(),
            events: ledger.last_event_seq(),
        }
    }
}

fn mirror_transaction<E: EncryptedArithmetic>(
    mirror: &dyn StateMirror,
    ledger: &ScreeningLedger<E>,
    id: u64,
) {
    match ledger.transaction(id) {
        Ok(view) => put_json(mirror, &transaction_key(id), &view),
        Err(e) => warn!("Mirror skipped transaction {}: {}", id, e),
    }
}

/// Mirror writes never fail the protocol operation.
fn put_json<T: Serialize>(mirror: &dyn StateMirror, key: &str, value: &T) {
    let bytes = match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Mirror encode failed for {}: {}", key, e);
            return;
        }
    };
    if let Err(e) = mirror.set(key, &bytes) {
        warn!("Mirror write failed for {}: {:#}", key, e);
    }
}
