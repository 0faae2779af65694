//! Cipherscreen Core
//!
//! Encrypted threshold screening: banks submit encrypted amounts, the ledger
//! compares them against an encrypted threshold without decrypting, and only
//! a transaction's submitter can trigger a one-time, proof-verified
//! disclosure of the result.

pub mod api;
pub mod protocol;
pub mod relay;
pub mod service;
pub mod storage;

pub use protocol::{ProtocolError, ScreeningLedger};
pub use service::LedgerService;
