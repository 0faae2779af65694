//! Cipherscreen Node
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Cipherscreen Node                        │
//! │                                                              │
//! │  ┌─────────────┐      ┌──────────────────┐                   │
//! │  │  HTTP API   │─────▶│  LedgerService   │──▶ RocksDB mirror │
//! │  │  (axum)     │      │  (serialized)    │                   │
//! │  └─────────────┘      └────────▲─────────┘                   │
//! │                                │ on_disclosure               │
//! │  ┌─────────────────┐   ┌───────┴────────┐                    │
//! │  │ ReferenceEngine │──▶│ Disclosure     │                    │
//! │  │ (K-of-N)        │   │ relay          │                    │
//! │  └─────────────────┘   └────────────────┘                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cipherscreen_config::CipherscreenConfig;
use cipherscreen_core::api::{ApiState, SharedEngine, create_router};
use cipherscreen_core::storage::{RocksDbMirror, StateMirror};
use cipherscreen_core::{LedgerService, ScreeningLedger};
use cipherscreen_core::relay::spawn_relay;
use cipherscreen_engine::ReferenceEngine;
use log::{info, warn};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = CipherscreenConfig::load()?;
    let administrators = config.administrator_identities()?;

    info!("============================================");
    info!("  Cipherscreen node v{}", env!("CARGO_PKG_VERSION"));
    info!("============================================");
    info!("API address       : {}", config.api_addr());
    info!(
        "Committee         : {}-of-{}",
        config.engine.threshold_k, config.engine.threshold_n
    );
    info!("Administrators    : {}", administrators.len());
    info!("Relay interval    : {}ms", config.engine.relay_interval_ms);
    info!("============================================");

    // Engine
    let engine = Arc::new(
        ReferenceEngine::new(config.engine.threshold_k, config.engine.threshold_n)
            .context("failed to build reference engine")?,
    );
    let engine_info = engine.public_info();
    let shared: SharedEngine = engine.clone();

    // Ledger + mirror
    let ledger = ScreeningLedger::new(shared, administrators)?;
    let mut service = LedgerService::new(ledger);
    if config.database.mirror {
        let mirror: Arc<dyn StateMirror> = Arc::new(
            RocksDbMirror::open(&config.database.path)
                .with_context(|| format!("failed to open mirror at {}", config.database.path))?,
        );
        service = service.with_mirror(mirror);
        info!("Mirroring ledger to {}", config.database.path);
    } else {
        warn!("Display mirror disabled");
    }

    // Relay
    let shutdown = CancellationToken::new();
    let relay = spawn_relay(
        engine,
        service.clone(),
        Duration::from_millis(config.engine.relay_interval_ms),
        shutdown.clone(),
    );

    // HTTP API
    let router = create_router(ApiState::new(service, Some(engine_info)));
    let listener = TcpListener::bind(config.api_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.api_addr()))?;
    info!("HTTP API listening on {}", config.api_addr());

    let api_shutdown = shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutdown signal received");
            api_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    relay.await?;
    info!("Cipherscreen node stopped");
    Ok(())
}
