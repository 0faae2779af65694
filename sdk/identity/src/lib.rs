//! Cipherscreen Identities
//!
//! Principals are 32-byte addresses derived from an Ed25519 verifying key.
//! Every state-changing call made by a bank or an administrator travels as a
//! [`SignedCall`]; the caller identity is only ever recovered from a verified
//! signature, never taken from the request body.

pub mod call;
pub mod keypair;

pub use call::{ReplayGuard, SignedCall};
pub use keypair::Keypair;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;
use wincode::{SchemaRead, SchemaWrite};

/// Identity errors
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid identity encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid verifying key")]
    InvalidVerifyingKey,

    #[error("signature verification failed")]
    BadSignature,

    #[error("stale nonce: got {got}, last accepted {last}")]
    StaleNonce { got: u64, last: u64 },

    #[error("payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// An opaque principal (address equivalent).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SchemaRead, SchemaWrite)]
pub struct Identity(pub [u8; 32]);

impl Identity {
    pub const LEN: usize = 32;

    /// Derives the identity bound to an Ed25519 verifying key.
    /// Formula: SHA256( verifying_key_bytes )
    pub fn from_verifying_key(vk: &[u8; 32]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(vk);
        Identity(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short form for log lines
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({}..)", self.short())
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| IdentityError::InvalidEncoding(e.to_string()))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            IdentityError::InvalidEncoding(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Identity(arr))
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
