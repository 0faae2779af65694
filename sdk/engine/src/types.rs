//! Opaque values crossing the engine boundary.
//!
//! The ledger stores and forwards these blobs but never looks inside them.
//! `Debug` prints lengths only so ciphertext material stays out of logs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Encrypted numeric value, meaningful only to the engine.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext(#[serde(with = "hex")] pub Vec<u8>);

/// Encrypted boolean produced by a homomorphic comparison.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBool(#[serde(with = "hex")] pub Vec<u8>);

impl Ciphertext {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl EncryptedBool {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ciphertext({} bytes)", self.0.len())
    }
}

impl fmt::Debug for EncryptedBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedBool({} bytes)", self.0.len())
    }
}

/// Engine-assigned handle for an outstanding disclosure.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(#[serde(with = "hex")] pub [u8; 32]);

impl RequestId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({}..)", hex::encode(&self.0[..4]))
    }
}

/// A completed disclosure as delivered to the ledger's callback entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclosure {
    pub request_id: RequestId,
    #[serde(with = "hex")]
    pub cleartext: Vec<u8>,
    #[serde(with = "hex")]
    pub proof: Vec<u8>,
}
