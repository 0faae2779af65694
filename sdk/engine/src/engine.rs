use std::sync::Arc;

use thiserror::Error;

use crate::types::{Ciphertext, EncryptedBool, RequestId};

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("insufficient shares: got {got}, need {need}")]
    InsufficientShares { got: usize, need: usize },

    #[error("invalid threshold: k={k}, n={n}")]
    InvalidThreshold { k: usize, n: usize },

    #[error("invalid share format")]
    InvalidShare,

    #[error("malformed ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("engine state unavailable")]
    Unavailable,
}

/// The encrypted-arithmetic boundary.
///
/// `compare_gt` and `request_disclosure` return synchronously; the plaintext
/// of a disclosure arrives later, out of band, as a
/// [`Disclosure`](crate::Disclosure) handed to the ledger's callback.
pub trait EncryptedArithmetic: Send + Sync {
    /// Homomorphic `lhs > rhs`.
    fn compare_gt(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<EncryptedBool, EngineError>;

    /// Queues a cooperative decryption of `handle` and returns its request id.
    fn request_disclosure(&self, handle: &EncryptedBool) -> Result<RequestId, EngineError>;

    /// Checks that `proof` authenticates `cleartext` as the decryption result
    /// for `request_id`.
    fn verify_proof(&self, request_id: &RequestId, cleartext: &[u8], proof: &[u8]) -> bool;
}

impl<E: EncryptedArithmetic + ?Sized> EncryptedArithmetic for Arc<E> {
    fn compare_gt(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<EncryptedBool, EngineError> {
        (**self).compare_gt(lhs, rhs)
    }

    fn request_disclosure(&self, handle: &EncryptedBool) -> Result<RequestId, EngineError> {
        (**self).request_disclosure(handle)
    }

    fn verify_proof(&self, request_id: &RequestId, cleartext: &[u8], proof: &[u8]) -> bool {
        (**self).verify_proof(request_id, cleartext, proof)
    }
}
