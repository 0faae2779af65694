//! Signed call envelopes
//!
//! ```text
//! digest = BLAKE3-derive("cipherscreen-signed-call-v2")(
//!     len_le(operation) || operation || nonce_le || json(payload) )
//! signature = Ed25519(signer, digest)
//! ```
//!
//! `payload` is a `serde_json::Value`, whose object keys serialize in sorted
//! order, so signer and verifier produce identical bytes. The operation name
//! binds the signature to one endpoint: an envelope signed for one operation
//! fails verification under any other.

use std::collections::HashMap;

use ed25519_dalek::{Signature, VerifyingKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Identity, IdentityError};

const CALL_DOMAIN: &str = "cipherscreen-signed-call-v2";

/// A payload signed by its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedCall {
    /// Ed25519 verifying key of the caller
    #[serde(with = "hex")]
    pub signer_pubkey: [u8; 32],
    /// Operation the caller meant to invoke, e.g. `admin.admit`
    pub operation: String,
    /// Per-signer strictly increasing counter
    pub nonce: u64,
    /// Operation-specific body
    pub payload: serde_json::Value,
    /// Ed25519 signature over the call digest
    #[serde(with = "hex")]
    pub signature: Vec<u8>,
}

impl SignedCall {
    pub(crate) fn digest(
        operation: &str,
        nonce: u64,
        payload: &serde_json::Value,
    ) -> Result<[u8; 32], IdentityError> {
        let body = serde_json::to_vec(payload)?;
        let mut hasher = blake3::Hasher::new_derive_key(CALL_DOMAIN);
        hasher.update(&(operation.len() as u64).to_le_bytes());
        hasher.update(operation.as_bytes());
        hasher.update(&nonce.to_le_bytes());
        hasher.update(&body);
        Ok(*hasher.finalize().as_bytes())
    }

    /// Verifies the signature for `operation` and returns the caller identity.
    /// An envelope signed for a different operation is a bad signature.
    pub fn verify_for(&self, operation: &str) -> Result<Identity, IdentityError> {
        if self.operation != operation {
            return Err(IdentityError::BadSignature);
        }
        self.verify()
    }

    /// Verifies the signature over the envelope's own operation.
    pub fn verify(&self) -> Result<Identity, IdentityError> {
        let vk = VerifyingKey::from_bytes(&self.signer_pubkey)
            .map_err(|_| IdentityError::InvalidVerifyingKey)?;
        let signature =
            Signature::from_slice(&self.signature).map_err(|_| IdentityError::BadSignature)?;
        let digest = Self::digest(&self.operation, self.nonce, &self.payload)?;

        vk.verify_strict(&digest, &signature)
            .map_err(|_| IdentityError::BadSignature)?;

        Ok(Identity::from_verifying_key(&self.signer_pubkey))
    }

    /// Decodes the payload into an operation body.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, IdentityError> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// Rejects signed calls whose nonce does not advance past the last one
/// accepted from the same identity.
#[derive(Debug, Default)]
pub struct ReplayGuard {
    last_nonce: HashMap<Identity, u64>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `nonce` for `identity` if it is fresh.
    pub fn check_and_record(&mut self, identity: Identity, nonce: u64) -> Result<(), IdentityError> {
        match self.last_nonce.get(&identity) {
            Some(&last) if nonce <= last => Err(IdentityError::StaleNonce { got: nonce, last }),
            _ => {
                self.last_nonce.insert(identity, nonce);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::Keypair;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Admit {
        identity: Identity,
    }

    #[test]
    fn verify_recovers_signer_identity() {
        let kp = Keypair::generate();
        let body = Admit {
            identity: Identity([3u8; 32]),
        };
        let call = kp.sign_call("admin.admit", 1, &body).unwrap();

        assert_eq!(call.verify().unwrap(), kp.identity());
        assert_eq!(call.decode::<Admit>().unwrap(), body);
    }

    #[test]
    fn tampered_payload_fails() {
        let kp = Keypair::generate();
        let mut call = kp
            .sign_call("admin.admit", 1, &Admit {
                identity: Identity([3u8; 32]),
            })
            .unwrap();

        call.payload = json!({ "identity": hex::encode([4u8; 32]) });
        assert!(matches!(call.verify(), Err(IdentityError::BadSignature)));
    }

    #[test]
    fn tampered_nonce_fails() {
        let kp = Keypair::generate();
        let mut call = kp.sign_call("t", 5, &json!({ "x": 1 })).unwrap();
        call.nonce = 6;
        assert!(call.verify().is_err());
    }

    #[test]
    fn swapped_signer_key_fails() {
        let kp = Keypair::generate();
        let other = Keypair::generate();
        let mut call = kp.sign_call("t", 1, &json!({ "x": 1 })).unwrap();
        call.signer_pubkey = other.verifying_key_bytes();
        assert!(call.verify().is_err());
    }

    #[test]
    fn envelope_survives_json_transport() {
        let kp = Keypair::generate();
        let call = kp.sign_call("t", 9, &json!({ "b": 2, "a": [1, 2, 3] })).unwrap();

        let wire = serde_json::to_string(&call).unwrap();
        let received: SignedCall = serde_json::from_str(&wire).unwrap();
        assert_eq!(received.verify().unwrap(), kp.identity());
    }

    #[test]
    fn envelope_is_bound_to_its_operation() {
        let kp = Keypair::generate();
        let call = kp
            .sign_call("admin.admit", 1, &Admit {
                identity: Identity([3u8; 32]),
            })
            .unwrap();
        assert_eq!(call.verify_for("admin.admit").unwrap(), kp.identity());

        // Presented to another endpoint as-is
        assert!(matches!(
            call.verify_for("admin.add_administrator"),
            Err(IdentityError::BadSignature)
        ));

        // Relabelled to match the other endpoint
        let mut relabelled = call.clone();
        relabelled.operation = "admin.add_administrator".into();
        assert!(matches!(
            relabelled.verify_for("admin.add_administrator"),
            Err(IdentityError::BadSignature)
        ));
    }

    #[test]
    fn operation_length_prefix_separates_fields() {
        let payload = json!({ "x": 1 });
        let a = SignedCall::digest("ab", 1, &payload).unwrap();
        let b = SignedCall::digest("a", 1, &payload).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn replay_guard_requires_increasing_nonces() {
        let mut guard = ReplayGuard::new();
        let id = Identity([1u8; 32]);

        guard.check_and_record(id, 1).unwrap();
        guard.check_and_record(id, 2).unwrap();
        assert!(matches!(
            guard.check_and_record(id, 2),
            Err(IdentityError::StaleNonce { got: 2, last: 2 })
        ));
        // Other identities keep independent counters
        guard.check_and_record(Identity([2u8; 32]), 1).unwrap();
        guard.check_and_record(id, 3).unwrap();
    }
}
