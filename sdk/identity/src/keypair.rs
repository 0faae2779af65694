use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;
use serde::Serialize;

use crate::{Identity, IdentityError, SignedCall};

/// A bank's or administrator's signing key.
/// NEVER expose this struct's internals.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a fresh random keypair.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_secret_bytes(&seed)
    }

    /// Reconstructs a keypair from its 32-byte secret seed.
    pub fn from_secret_bytes(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Secret seed bytes (for key files)
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The public identity (the "address").
    pub fn identity(&self) -> Identity {
        Identity::from_verifying_key(&self.verifying_key_bytes())
    }

    /// Signs a call payload for `operation` under the given nonce.
    pub fn sign_call<T: Serialize>(
        &self,
        operation: &str,
        nonce: u64,
        payload: &T,
    ) -> Result<SignedCall, IdentityError> {
        let payload = serde_json::to_value(payload)?;
        let digest = SignedCall::digest(operation, nonce, &payload)?;
        let signature = self.signing_key.sign(&digest).to_bytes().to_vec();

        Ok(SignedCall {
            signer_pubkey: self.verifying_key_bytes(),
            operation: operation.to_string(),
            nonce,
            payload,
            signature,
        })
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_secret_bytes(&self.secret_bytes())
    }
}
