//! Display mirror for the presentation layer.
//!
//! A generic key/value accessor the service copies committed ledger state
//! into. The protocol never reads from it and stays correct without one.

pub mod db;
pub mod mirror;

pub use db::RocksDbMirror;
pub use mirror::{MemoryMirror, StateMirror, event_key, result_key, transaction_key};
