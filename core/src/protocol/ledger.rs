use cipherscreen_engine::{Ciphertext, EncryptedBool};
use cipherscreen_identity::Identity;
use serde::{Deserialize, Serialize};

use super::error::ProtocolError;

/// A submitted transaction. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedTransaction {
    /// Dense, 1-based
    pub id: u64,
    pub submitter: Identity,
    pub amount_ciphertext: Ciphertext,
    /// Encrypted `amount > threshold` at submission time
    pub suspicious_ciphertext: EncryptedBool,
    /// Unix seconds
    pub created_at: u64,
}

/// Append-only transaction store. Entry `i` holds id `i + 1`, which keeps ids
/// dense and gap-free by construction.
#[derive(Debug, Default)]
pub struct TransactionLedger {
    entries: Vec<EncryptedTransaction>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u64 {
        self.entries.len() as u64 + 1
    }

    pub(crate) fn append(
        &mut self,
        submitter: Identity,
        amount_ciphertext: Ciphertext,
        suspicious_ciphertext: EncryptedBool,
        created_at: u64,
    ) -> u64 {
        let id = self.next_id();
        self.entries.push(EncryptedTransaction {
            id,
            submitter,
            amount_ciphertext,
            suspicious_ciphertext,
            created_at,
        });
        id
    }

    pub fn get(&self, id: u64) -> Result<&EncryptedTransaction, ProtocolError> {
        id.checked_sub(1)
            .and_then(|idx| self.entries.get(idx as usize))
            .ok_or(ProtocolError::NotFound(id))
    }

    pub fn by_submitter<'a>(
        &'a self,
        submitter: &'a Identity,
    ) -> impl Iterator<Item = &'a EncryptedTransaction> + 'a {
        self.entries.iter().filter(move |tx| &tx.submitter == submitter)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
