//! Sealed values
//!
//! Wire layout of every [`Ciphertext`] and [`EncryptedBool`] produced by the
//! reference engine:
//!
//! ```text
//! SealedValue (wincode)
//!   version | kind | epoch | nonce | body = ChaCha20Poly1305(key, plaintext, aad)
//!   shares  = Shamir(key) sealed per committee member
//! aad = version || kind || epoch_le
//! ```

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use rand::RngCore;
use wincode::{SchemaRead, SchemaWrite};

use crate::committee::{Committee, EncryptedShare, LocalCommitteeMember};
use crate::engine::EngineError;
use crate::shares::{Share, combine_shares, random_secret, split_secret};
use crate::types::{Ciphertext, EncryptedBool};

pub const SEALED_VERSION_V1: u8 = 1;
pub const KIND_U64: u8 = 1;
pub const KIND_BOOL: u8 = 2;

#[derive(Debug, Clone, SchemaRead, SchemaWrite)]
pub struct SealedValue {
    pub version: u8,
    pub kind: u8,
    pub epoch: u64,
    pub nonce: [u8; 12],
    pub body: Vec<u8>,
    pub shares: Vec<EncryptedShare>,
}

impl SealedValue {
    /// Seals `plaintext` to the committee under a fresh one-time key.
    pub fn seal(plaintext: &[u8], kind: u8, committee: &Committee) -> Result<Self, EngineError> {
        let key = random_secret();
        let shares = split_secret(
            &key,
            committee.config.threshold,
            committee.config.total_members,
        )?;

        let sealed_shares = shares
            .iter()
            .zip(committee.members.iter())
            .map(|(share, member)| EncryptedShare::seal(share, &member.public_key))
            .collect::<Result<Vec<_>, _>>()?;

        let mut nonce = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce);

        let aad = associated_data(SEALED_VERSION_V1, kind, committee.config.epoch);
        let cipher =
            ChaCha20Poly1305::new_from_slice(&key).map_err(|_| EngineError::EncryptionFailed)?;
        let body = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| EngineError::EncryptionFailed)?;

        Ok(Self {
            version: SEALED_VERSION_V1,
            kind,
            epoch: committee.config.epoch,
            nonce,
            body,
            shares: sealed_shares,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EngineError> {
        wincode::serialize(self).map_err(|e| EngineError::InvalidCiphertext(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EngineError> {
        let sealed: SealedValue = wincode::deserialize(bytes)
            .map_err(|e| EngineError::InvalidCiphertext(e.to_string()))?;
        if sealed.version != SEALED_VERSION_V1 {
            return Err(EngineError::InvalidCiphertext(format!(
                "unsupported version {}",
                sealed.version
            )));
        }
        Ok(sealed)
    }

    /// The shares the given members can open.
    pub fn open_shares(&self, members: &[LocalCommitteeMember]) -> Vec<Share> {
        members
            .iter()
            .filter_map(|member| {
                let sealed = self.shares.iter().find(|s| s.member_id == member.id)?;
                member.open_share(sealed).ok()
            })
            .collect()
    }

    /// Decrypts the body from at least `threshold` recovered shares.
    pub fn open_with_shares(&self, shares: &[Share], threshold: usize) -> Result<Vec<u8>, EngineError> {
        let key = combine_shares(shares, threshold)?;
        let aad = associated_data(self.version, self.kind, self.epoch);
        let cipher =
            ChaCha20Poly1305::new_from_slice(&key).map_err(|_| EngineError::DecryptionFailed)?;

        cipher
            .decrypt(
                Nonce::from_slice(&self.nonce),
                Payload {
                    msg: self.body.as_slice(),
                    aad: &aad,
                },
            )
            .map_err(|_| EngineError::DecryptionFailed)
    }
}

fn associated_data(version: u8, kind: u8, epoch: u64) -> [u8; 10] {
    let mut aad = [0u8; 10];
    aad[0] = version;
    aad[1] = kind;
    aad[2..].copy_from_slice(&epoch.to_le_bytes());
    aad
}

/// Seals an amount for submission. Runs client-side against the public
/// committee description.
pub fn seal_u64(value: u64, committee: &Committee) -> Result<Ciphertext, EngineError> {
    let sealed = SealedValue::seal(&value.to_le_bytes(), KIND_U64, committee)?;
    Ok(Ciphertext(sealed.to_bytes()?))
}

/// Seals a boolean as a single `0x00` / `0x01` byte.
pub fn seal_bool(value: bool, committee: &Committee) -> Result<EncryptedBool, EngineError> {
    let sealed = SealedValue::seal(&[value as u8], KIND_BOOL, committee)?;
    Ok(EncryptedBool(sealed.to_bytes()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_members_open_a_sealed_amount() {
        let (committee, locals) = Committee::generate_local(2, 3).unwrap();
        let ct = seal_u64(1_500, &committee).unwrap();

        let sealed = SealedValue::from_bytes(ct.as_bytes()).unwrap();
        assert_eq!(sealed.kind, KIND_U64);

        let shares = sealed.open_shares(&locals[1..]);
        let plaintext = sealed.open_with_shares(&shares, 2).unwrap();
        assert_eq!(plaintext, 1_500u64.to_le_bytes());
    }

    #[test]
    fn single_member_cannot_open_a_two_of_three_value() {
        let (committee, locals) = Committee::generate_local(2, 3).unwrap();
        let ct = seal_u64(7, &committee).unwrap();
        let sealed = SealedValue::from_bytes(ct.as_bytes()).unwrap();

        let shares = sealed.open_shares(&locals[..1]);
        assert!(matches!(
            sealed.open_with_shares(&shares, 2),
            Err(EngineError::InsufficientShares { .. })
        ));
    }

    #[test]
    fn relabelled_kind_breaks_authentication() {
        let (committee, locals) = Committee::generate_local(1, 1).unwrap();
        let ct = seal_u64(7, &committee).unwrap();
        let mut sealed = SealedValue::from_bytes(ct.as_bytes()).unwrap();
        sealed.kind = KIND_BOOL;

        let shares = sealed.open_shares(&locals);
        assert!(matches!(
            sealed.open_with_shares(&shares, 1),
            Err(EngineError::DecryptionFailed)
        ));
    }

    #[test]
    fn garbage_bytes_are_not_a_ciphertext() {
        assert!(SealedValue::from_bytes(&[0xff, 0x00, 0x01]).is_err());
    }

    #[test]
    fn sealing_is_randomized() {
        let (committee, _) = Committee::generate_local(1, 2).unwrap();
        let a = seal_u64(10, &committee).unwrap();
        let b = seal_u64(10, &committee).unwrap();
        assert_ne!(a, b);
    }
}
