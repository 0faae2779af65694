use std::sync::Arc;

use cipherscreen_engine::{Ciphertext, Disclosure, ReferenceEngine, seal_u64};
use cipherscreen_identity::Identity;

use super::ScreeningLedger;


/// Helpers

pub(super) type Ledger = ScreeningLedger<Arc<ReferenceEngine>>;

pub(super) fn identity(b: u8) -> Identity {
    Identity([b; 32])
}

pub(super) const ADMIN: u8 = 0xAD;
pub(super) const BANK_A: u8 = 0xA1;
pub(super) const BANK_B: u8 = 0xB2;

/// Ledger with a 2-of-3 reference engine, one administrator, banks A and B
/// admitted and no threshold set.
pub(super) fn setup() -> (Ledger, Arc<ReferenceEngine>) {
    let engine = Arc::new(ReferenceEngine::new(2, 3).unwrap());
    let mut ledger = ScreeningLedger::new(engine.clone(), [identity(ADMIN)]).unwrap();
    ledger.admit(&identity(ADMIN), identity(BANK_A)).unwrap();
    ledger.admit(&identity(ADMIN), identity(BANK_B)).unwrap();
    (ledger, engine)
}

pub(super) fn seal(engine: &ReferenceEngine, value: u64) -> Ciphertext {
    seal_u64(value, engine.committee()).unwrap()
}

/// Same as `setup`, with the threshold set to `threshold`.
pub(super) fn setup_with_threshold(threshold: u64) -> (Ledger, Arc<ReferenceEngine>) {
    let (mut ledger, engine) = setup();
    ledger
        .set_threshold(&identity(ADMIN), seal(&engine, threshold))
        .unwrap();
    (ledger, engine)
}

/// Runs the committee and returns the single disclosure it produced.
pub(super) fn run_committee(engine: &ReferenceEngine) -> Disclosure {
    assert_eq!(engine.process_pending().unwrap(), 1);
    let mut done = engine.drain_completed();
    assert_eq!(done.len(), 1);
    done.remove(0)
}
