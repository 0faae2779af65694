//! In-process walkthrough of the screening protocol.

use std::sync::Arc;

use anyhow::{Result, bail};
use cipherscreen_core::ScreeningLedger;
use cipherscreen_core::relay::DisclosureSource;
use cipherscreen_engine::{ReferenceEngine, seal_u64};
use cipherscreen_identity::Keypair;

const THRESHOLD: u64 = 10_000;

pub fn run_demo() -> Result<()> {
    let engine = Arc::new(ReferenceEngine::new(2, 3)?);
    let admin = Keypair::generate();
    let bank_a = Keypair::generate();
    let bank_b = Keypair::generate();

    let mut ledger = ScreeningLedger::new(engine.clone(), [admin.identity()])?;
    ledger.admit(&admin.identity(), bank_a.identity())?;
    ledger.admit(&admin.identity(), bank_b.identity())?;
    ledger.set_threshold(&admin.identity(), seal_u64(THRESHOLD, engine.committee())?)?;
    println!("🏦 Admitted bank A ({})", bank_a.identity().short());
    println!("🏦 Admitted bank B ({})", bank_b.identity().short());
    println!("🔒 Threshold set (sealed to a 2-of-3 committee)");
    println!();

    for amount in [12_500, 7_000] {
        let id = ledger.submit(&bank_a.identity(), seal_u64(amount, engine.committee())?)?;
        ledger.request_disclosure(&bank_a.identity(), id)?;

        for d in engine.poll_disclosures()? {
            ledger.on_disclosure(&d.request_id, &d.cleartext, &d.proof)?;
        }
        let flagged = ledger.disclosed_result(id)?;
        println!(
            "📨 Bank A submitted {} as transaction #{} -> suspicious: {:?}",
            amount, id, flagged
        );
        if flagged != Some(amount > THRESHOLD) {
            bail!("transaction #{} disclosed the wrong result", id);
        }
    }

    match ledger.request_disclosure(&bank_b.identity(), 1) {
        Err(e) => println!("🚫 Bank B asking to disclose #1: {} ({})", e, e.code()),
        Ok(_) => bail!("bank B was allowed to disclose bank A's transaction"),
    }

    println!();
    println!("📜 Audit journal:");
    for recorded in ledger.events() {
        println!("  #{:<3} {}", recorded.seq, serde_json::to_string(&recorded.event)?);
    }
    Ok(())
}
