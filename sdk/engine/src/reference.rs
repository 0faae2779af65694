//! Reference Engine
//!
//! An in-process stand-in for the encrypted-arithmetic service. The whole
//! decryption committee lives locally, so `compare_gt` is evaluated by
//! opening both operands with K members and re-sealing the result. It keeps
//! the boundary semantics honest (opaque blobs in, attested disclosures out,
//! asynchronous delivery) without implementing a homomorphic scheme.
//!
//! ```text
//! request_disclosure ──▶ pending ──process_pending──▶ completed ──drain──▶ ledger callback
//!                         (K-of-N shares collected, key recovered, result attested)
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::attestation::{Attestor, verify_attestation};
use crate::collector::ShareCollector;
use crate::committee::{Committee, LocalCommitteeMember};
use crate::engine::{EncryptedArithmetic, EngineError};
use crate::sealed::{KIND_BOOL, KIND_U64, SealedValue, seal_bool};
use crate::types::{Ciphertext, Disclosure, EncryptedBool, RequestId};

const REQUEST_ID_DOMAIN: &str = "cipherscreen-request-id-v1";

/// What clients need to seal values and check disclosures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnginePublicInfo {
    pub committee: Committee,
    #[serde(with = "hex")]
    pub attestation_key: [u8; 32],
}

struct PendingDisclosure {
    request_id: RequestId,
    handle: EncryptedBool,
}

#[derive(Default)]
struct DisclosureQueue {
    issued: u64,
    pending: VecDeque<PendingDisclosure>,
    completed: VecDeque<Disclosure>,
}

pub struct ReferenceEngine {
    committee: Committee,
    members: Vec<LocalCommitteeMember>,
    attestor: Attestor,
    queue: Mutex<DisclosureQueue>,
}

impl ReferenceEngine {
    /// Builds an engine with a freshly generated K-of-N committee.
    pub fn new(threshold: usize, total: usize) -> Result<Self, EngineError> {
        let (committee, members) = Committee::generate_local(threshold, total)?;
        Self::from_parts(committee, members, Attestor::generate())
    }

    pub fn from_parts(
        committee: Committee,
        members: Vec<LocalCommitteeMember>,
        attestor: Attestor,
    ) -> Result<Self, EngineError> {
        if members.len() < committee.config.threshold {
            return Err(EngineError::InsufficientShares {
                got: members.len(),
                need: committee.config.threshold,
            });
        }
        Ok(Self {
            committee,
            members,
            attestor,
            queue: Mutex::new(DisclosureQueue::default()),
        })
    }

    pub fn committee(&self) -> &Committee {
        &self.committee
    }

    pub fn attestation_key(&self) -> [u8; 32] {
        self.attestor.verifying_key_bytes()
    }

    pub fn public_info(&self) -> EnginePublicInfo {
        EnginePublicInfo {
            committee: self.committee.clone(),
            attestation_key: self.attestation_key(),
        }
    }

    fn open(&self, bytes: &[u8], expected_kind: u8) -> Result<Vec<u8>, EngineError> {
        let sealed = SealedValue::from_bytes(bytes)?;
        if sealed.kind != expected_kind {
            return Err(EngineError::InvalidCiphertext(format!(
                "expected kind {expected_kind}, got {}",
                sealed.kind
            )));
        }
        if sealed.epoch != self.committee.config.epoch {
            return Err(EngineError::InvalidCiphertext(format!(
                "sealed under epoch {}, committee is at {}",
                sealed.epoch, self.committee.config.epoch
            )));
        }

        let shares = sealed.open_shares(&self.members);
        sealed.open_with_shares(&shares, self.committee.config.threshold)
    }

    fn open_u64(&self, ct: &Ciphertext) -> Result<u64, EngineError> {
        let plaintext = self.open(ct.as_bytes(), KIND_U64)?;
        let bytes: [u8; 8] = plaintext
            .try_into()
            .map_err(|_| EngineError::InvalidCiphertext("amount is not 8 bytes".into()))?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn decrypt_job(&self, job: &PendingDisclosure) -> Result<Disclosure, EngineError> {
        let sealed = SealedValue::from_bytes(job.handle.as_bytes())?;
        if sealed.kind != KIND_BOOL {
            return Err(EngineError::InvalidCiphertext("not an encrypted bool".into()));
        }

        let threshold = self.committee.config.threshold;
        let mut collector = ShareCollector::new(threshold);
        for share in sealed.open_shares(&self.members) {
            collector.submit_share(job.request_id, share);
            if collector.can_decrypt(&job.request_id) {
                break;
            }
        }
        if !collector.can_decrypt(&job.request_id) {
            return Err(EngineError::InsufficientShares {
                got: collector.share_count(&job.request_id),
                need: threshold,
            });
        }

        let cleartext = sealed.open_with_shares(&collector.take(&job.request_id), threshold)?;
        let proof = self.attestor.attest(&job.request_id, &cleartext);

        Ok(Disclosure {
            request_id: job.request_id,
            cleartext,
            proof,
        })
    }

    /// Runs the committee over every queued request, moving results to the
    /// completed queue. Returns how many disclosures were produced.
    pub fn process_pending(&self) -> Result<usize, EngineError> {
        let jobs: Vec<PendingDisclosure> = {
            let mut queue = self.queue.lock().map_err(|_| EngineError::Unavailable)?;
            queue.pending.drain(..).collect()
        };

        let mut produced = Vec::with_capacity(jobs.len());
        for job in &jobs {
            match self.decrypt_job(job) {
                Ok(disclosure) => produced.push(disclosure),
                Err(e) => warn!("Dropping disclosure request {}: {}", job.request_id, e),
            }
        }

        let count = produced.len();
        let mut queue = self.queue.lock().map_err(|_| EngineError::Unavailable)?;
        queue.completed.extend(produced);
        debug!("Committee produced {} disclosures", count);
        Ok(count)
    }

    /// Takes every completed disclosure, oldest first.
    pub fn drain_completed(&self) -> Vec<Disclosure> {
        self.queue
            .lock()
            .map(|mut queue| queue.completed.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().map(|q| q.pending.len()).unwrap_or(0)
    }
}

impl EncryptedArithmetic for ReferenceEngine {
    fn compare_gt(&self, lhs: &Ciphertext, rhs: &Ciphertext) -> Result<EncryptedBool, EngineError> {
        let gt = self.open_u64(lhs)? > self.open_u64(rhs)?;
        seal_bool(gt, &self.committee)
    }

    fn request_disclosure(&self, handle: &EncryptedBool) -> Result<RequestId, EngineError> {
        // Reject obviously foreign blobs before handing out a request id
        let sealed = SealedValue::from_bytes(handle.as_bytes())?;
        if sealed.kind != KIND_BOOL {
            return Err(EngineError::InvalidCiphertext("not an encrypted bool".into()));
        }

        let mut queue = self.queue.lock().map_err(|_| EngineError::Unavailable)?;
        queue.issued += 1;

        let mut hasher = blake3::Hasher::new_derive_key(REQUEST_ID_DOMAIN);
        hasher.update(&queue.issued.to_le_bytes());
        hasher.update(handle.as_bytes());
        let request_id = RequestId(*hasher.finalize().as_bytes());

        queue.pending.push_back(PendingDisclosure {
            request_id,
            handle: handle.clone(),
        });
        Ok(request_id)
    }

    fn verify_proof(&self, request_id: &RequestId, cleartext: &[u8], proof: &[u8]) -> bool {
        verify_attestation(&self.attestation_key(), request_id, cleartext, proof)
    }
}
