//! Decryption Committee
//!
//! K-of-N custodians of the key material behind every sealed value. Each
//! member holds an X25519 key; shares are delivered to members sealed with an
//! ephemeral ECDH exchange.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::engine::EngineError;
use crate::shares::{Share, ShareId};

const SHARE_KEY_DOMAIN: &str = "cipherscreen-committee-share-v1";

/// Committee parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeConfig {
    /// Threshold K: minimum members needed to decrypt
    pub threshold: usize,
    /// Total members N
    pub total_members: usize,
    /// Key epoch; values sealed under another epoch are rejected
    pub epoch: u64,
}

impl CommitteeConfig {
    pub fn new(threshold: usize, total_members: usize) -> Self {
        Self {
            threshold,
            total_members,
            epoch: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.threshold > 0 && self.threshold <= self.total_members && self.total_members <= 255
    }
}

/// Public description of a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeMember {
    /// Member ID, doubles as the Shamir evaluation point
    pub id: ShareId,
    #[serde(with = "hex")]
    pub public_key: [u8; 32],
}

/// Public committee description, safe to hand to clients so they can seal
/// values themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committee {
    pub config: CommitteeConfig,
    pub members: Vec<CommitteeMember>,
}

impl Committee {
    pub fn new(config: CommitteeConfig, members: Vec<CommitteeMember>) -> Result<Self, EngineError> {
        if !config.is_valid() || members.len() != config.total_members {
            return Err(EngineError::InvalidThreshold {
                k: config.threshold,
                n: members.len(),
            });
        }
        Ok(Self { config, members })
    }

    /// Generates a committee whose members all live in this process.
    pub fn generate_local(
        threshold: usize,
        total: usize,
    ) -> Result<(Committee, Vec<LocalCommitteeMember>), EngineError> {
        let config = CommitteeConfig::new(threshold, total);
        if !config.is_valid() {
            return Err(EngineError::InvalidThreshold {
                k: threshold,
                n: total,
            });
        }

        let locals: Vec<LocalCommitteeMember> = (1..=total as u8)
            .map(LocalCommitteeMember::generate)
            .collect();
        let members = locals.iter().map(|m| m.to_member()).collect();

        Ok((Committee::new(config, members)?, locals))
    }
}

/// Committee member holding its secret key
pub struct LocalCommitteeMember {
    pub id: ShareId,
    secret_key: StaticSecret,
    pub public_key: PublicKey,
}

impl LocalCommitteeMember {
    pub fn generate(id: ShareId) -> Self {
        let secret_key = StaticSecret::random_from_rng(rand::thread_rng());
        let public_key = PublicKey::from(&secret_key);
        Self {
            id,
            secret_key,
            public_key,
        }
    }

    pub fn from_secret(id: ShareId, secret_bytes: [u8; 32]) -> Self {
        let secret_key = StaticSecret::from(secret_bytes);
        let public_key = PublicKey::from(&secret_key);
        Self {
            id,
            secret_key,
            public_key,
        }
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret_key.to_bytes()
    }

    pub fn to_member(&self) -> CommitteeMember {
        CommitteeMember {
            id: self.id,
            public_key: *self.public_key.as_bytes(),
        }
    }

    /// Opens the share sealed to this member.
    pub fn open_share(&self, sealed: &EncryptedShare) -> Result<Share, EngineError> {
        if sealed.member_id != self.id {
            return Err(EngineError::InvalidShare);
        }

        let sender_pk = PublicKey::from(sealed.ephemeral_pk);
        let shared_secret = self.secret_key.diffie_hellman(&sender_pk);
        let key = derive_share_key(shared_secret.as_bytes(), &sealed.ephemeral_pk);

        let cipher =
            ChaCha20Poly1305::new_from_slice(&key).map_err(|_| EngineError::DecryptionFailed)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
            .map_err(|_| EngineError::DecryptionFailed)?;

        let value: [u8; 32] = plaintext
            .try_into()
            .map_err(|_| EngineError::InvalidShare)?;
        Ok(Share::new(self.id, value))
    }
}

impl Clone for LocalCommitteeMember {
    fn clone(&self) -> Self {
        Self::from_secret(self.id, self.secret_bytes())
    }
}

/// A share sealed to one committee member
#[derive(Debug, Clone, SchemaRead, SchemaWrite)]
pub struct EncryptedShare {
    pub member_id: ShareId,
    pub ephemeral_pk: [u8; 32],
    pub nonce: [u8; 12],
    /// Share value + Poly1305 tag
    pub ciphertext: Vec<u8>,
}

impl EncryptedShare {
    pub fn seal(share: &Share, member_pk: &[u8; 32]) -> Result<Self, EngineError> {
        let mut rng = rand::thread_rng();
        let ephemeral_secret = EphemeralSecret::random_from_rng(&mut rng);
        let ephemeral_pk = PublicKey::from(&ephemeral_secret);

        let shared_secret = ephemeral_secret.diffie_hellman(&PublicKey::from(*member_pk));
        let key = derive_share_key(shared_secret.as_bytes(), ephemeral_pk.as_bytes());

        let mut nonce = [0u8; 12];
        rng.fill_bytes(&mut nonce);

        let cipher =
            ChaCha20Poly1305::new_from_slice(&key).map_err(|_| EngineError::EncryptionFailed)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), share.value.as_slice())
            .map_err(|_| EngineError::EncryptionFailed)?;

        Ok(Self {
            member_id: share.id,
            ephemeral_pk: *ephemeral_pk.as_bytes(),
            nonce,
            ciphertext,
        })
    }
}

fn derive_share_key(shared_secret: &[u8], ephemeral_pk: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(SHARE_KEY_DOMAIN);
    hasher.update(shared_secret);
    hasher.update(ephemeral_pk);
    *hasher.finalize().as_bytes()
}
