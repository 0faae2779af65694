//! Disclosure attestations
//!
//! The proof attached to a disclosure is an Ed25519 signature by the engine's
//! attestation key over
//! `BLAKE3-derive("cipherscreen-disclosure-v1")(request_id || len_le || cleartext)`.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::RngCore;

use crate::types::RequestId;

const ATTESTATION_DOMAIN: &str = "cipherscreen-disclosure-v1";

pub fn attestation_digest(request_id: &RequestId, cleartext: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(ATTESTATION_DOMAIN);
    hasher.update(request_id.as_bytes());
    hasher.update(&(cleartext.len() as u64).to_le_bytes());
    hasher.update(cleartext);
    *hasher.finalize().as_bytes()
}

/// Signs disclosure results on behalf of the committee.
pub struct Attestor {
    signing_key: SigningKey,
}

impl Attestor {
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_secret_bytes(&seed)
    }

    pub fn from_secret_bytes(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn attest(&self, request_id: &RequestId, cleartext: &[u8]) -> Vec<u8> {
        let digest = attestation_digest(request_id, cleartext);
        self.signing_key.sign(&digest).to_bytes().to_vec()
    }
}

/// Checks an attestation against a known attestation key.
pub fn verify_attestation(
    attestation_key: &[u8; 32],
    request_id: &RequestId,
    cleartext: &[u8],
    proof: &[u8],
) -> bool {
    let Ok(vk) = VerifyingKey::from_bytes(attestation_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(proof) else {
        return false;
    };
    vk.verify_strict(&attestation_digest(request_id, cleartext), &signature)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attestation_binds_request_and_cleartext() {
        let attestor = Attestor::generate();
        let vk = attestor.verifying_key_bytes();
        let rid = RequestId([1u8; 32]);
        let proof = attestor.attest(&rid, &[1]);

        assert!(verify_attestation(&vk, &rid, &[1], &proof));
        // Flipped result
        assert!(!verify_attestation(&vk, &rid, &[0], &proof));
        // Proof replayed for another request
        assert!(!verify_attestation(&vk, &RequestId([2u8; 32]), &[1], &proof));
        // Truncated proof
        assert!(!verify_attestation(&vk, &rid, &[1], &proof[..10]));
    }

    #[test]
    fn foreign_attestor_is_rejected() {
        let engine = Attestor::generate();
        let forger = Attestor::generate();
        let rid = RequestId([5u8; 32]);
        let forged = forger.attest(&rid, &[1]);
        assert!(!verify_attestation(&engine.verifying_key_bytes(), &rid, &[1], &forged));
    }
}
