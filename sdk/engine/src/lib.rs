//! Cipherscreen Encrypted-Arithmetic Engine
//!
//! The boundary the screening ledger talks to, plus a reference engine that
//! runs a K-of-N decryption committee in-process.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Engine Boundary                               │
//! │                                                                  │
//! │  1. Bank                   2. Ledger              3. Committee   │
//! │  ┌──────────┐             ┌──────────────┐       ┌──────────┐   │
//! │  │ seal_u64 │──ciphertext─▶│ compare_gt   │──────▶│ K-of-N   │   │
//! │  │ (client) │             │ (stays sealed)│ disc. │ decrypt  │   │
//! │  └──────────┘             └──────────────┘ req.  └────┬─────┘   │
//! │                                  ▲                    │         │
//! │                                  └── cleartext+proof ─┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod attestation;
pub mod collector;
pub mod committee;
pub mod engine;
pub mod reference;
pub mod sealed;
pub mod shares;
pub mod types;

pub use attestation::{Attestor, verify_attestation};
pub use committee::{Committee, CommitteeConfig, CommitteeMember, LocalCommitteeMember};
pub use engine::{EncryptedArithmetic, EngineError};
pub use reference::{EnginePublicInfo, ReferenceEngine};
pub use sealed::{seal_bool, seal_u64};
pub use types::{Ciphertext, Disclosure, EncryptedBool, RequestId};
