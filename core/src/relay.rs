//! Disclosure Relay
//!
//! Background task that carries finished disclosures from the engine to the
//! ledger's callback entry point. The ledger never trusts the relay: every
//! delivery is checked against its proof inside `on_disclosure`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use cipherscreen_engine::{Disclosure, EncryptedArithmetic, ReferenceEngine};
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::service::LedgerService;

/// Shortest poll period; `tokio::time::interval` panics on zero.
pub const MIN_RELAY_INTERVAL: Duration = Duration::from_millis(1);

/// Where completed disclosures come from.
pub trait DisclosureSource: Send + Sync + 'static {
    /// Returns every disclosure finished since the last poll.
    fn poll_disclosures(&self) -> Result<Vec<Disclosure>>;
}

impl DisclosureSource for ReferenceEngine {
    fn poll_disclosures(&self) -> Result<Vec<Disclosure>> {
        self.process_pending()?;
        Ok(self.drain_completed())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    pub delivered: usize,
    pub rejected: usize,
}

/// Polls `source` once and delivers everything it returned.
pub async fn relay_once<S, E>(source: &S, service: &LedgerService<E>) -> Result<RelayReport>
where
    S: DisclosureSource + ?Sized,
    E: EncryptedArithmetic,
{
    let mut report = RelayReport::default();

    for disclosure in source.poll_disclosures()? {
        let request_id = disclosure.request_id;
        match service.deliver(disclosure).await {
            Ok(result) => {
                debug!(
                    "Relayed disclosure {} for transaction {}",
                    request_id, result.transaction_id
                );
                report.delivered += 1;
            }
            Err(e) => {
                warn!("Disclosure {} rejected: {} ({})", request_id, e, e.code());
                report.rejected += 1;
            }
        }
    }
    Ok(report)
}

/// Spawns the relay loop. It stops when `shutdown` is cancelled.
pub fn spawn_relay<S, E>(
    source: Arc<S>,
    service: LedgerService<E>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    S: DisclosureSource + ?Sized,
    E: EncryptedArithmetic + 'static,
{
    if interval < MIN_RELAY_INTERVAL {
        warn!(
            "Relay interval {:?} too short, using {:?}",
            interval, MIN_RELAY_INTERVAL
        );
    }
    let interval = interval.max(MIN_RELAY_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        info!("Disclosure relay started ({:?} interval)", interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Disclosure relay stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match relay_once(source.as_ref(), &service).await {
                        Ok(report) if report.delivered + report.rejected > 0 => {
                            info!(
                                "Relay: {} delivered, {} rejected",
                                report.delivered, report.rejected
                            );
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Relay poll failed: {:#}", e),
                    }
                }
            }
        }
    })
}
