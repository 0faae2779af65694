//! API Handlers
//!
//! Request handlers for the HTTP API.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Json, Path, Query, State};
use cipherscreen_engine::{Disclosure, EncryptedArithmetic, EnginePublicInfo};
use cipherscreen_identity::{Identity, ReplayGuard, SignedCall};
use log::{debug, info};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::error::ApiError;
use super::types::*;
use crate::protocol::{DisclosedResult, TransactionView};
use crate::service::LedgerService;

/// Engine handle the API runs against
pub type SharedEngine = Arc<dyn EncryptedArithmetic>;

// ============================================================================
// Shared State
// ============================================================================

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub service: LedgerService<SharedEngine>,
    /// Published committee, if the engine runs in-process
    pub engine_info: Option<EnginePublicInfo>,
    pub replay_guard: Arc<Mutex<ReplayGuard>>,
    pub start_time: Instant,
}

impl ApiState {
    pub fn new(service: LedgerService<SharedEngine>, engine_info: Option<EnginePublicInfo>) -> Self {
        Self {
            service,
            engine_info,
            replay_guard: Arc::new(Mutex::new(ReplayGuard::new())),
            start_time: Instant::now(),
        }
    }

    /// Verifies the signature for `operation`, decodes the payload and
    /// burns the nonce. Once burned, the nonce stays used even if the
    /// operation itself is rejected.
    async fn authenticate<T: DeserializeOwned>(
        &self,
        call: &SignedCall,
        operation: &str,
    ) -> Result<(Identity, T), ApiError> {
        let caller = call.verify_for(operation)?;
        let payload = call.decode()?;
        self.replay_guard
            .lock()
            .await
            .check_and_record(caller, call.nonce)?;
        debug!(
            "Authenticated {} from {} (nonce {})",
            operation,
            caller.short(),
            call.nonce
        );
        Ok((caller, payload))
    }
}

// ============================================================================
// Health & Engine
// ============================================================================

/// Health check endpoint
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let stats = state.service.stats().await;

    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        transactions: stats.transactions,
        outstanding_disclosures: stats.outstanding_disclosures,
    })
}

/// Committee description clients seal amounts and thresholds to
pub async fn get_committee_info(
    State(state): State<ApiState>,
) -> Result<Json<EnginePublicInfo>, ApiError> {
    state
        .engine_info
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("engine committee is not published".into()))
}

// ============================================================================
// Governance
// ============================================================================

pub async fn admit_participant(
    State(state): State<ApiState>,
    Json(call): Json<SignedCall>,
) -> Result<Json<OperationResponse>, ApiError> {
    let (caller, req): (_, IdentityPayload) =
        state.authenticate(&call, operation::ADMIT).await?;
    state.service.admit(caller, req.identity).await?;
    Ok(Json(OperationResponse::ok(format!(
        "{} admitted",
        req.identity
    ))))
}

pub async fn add_administrator(
    State(state): State<ApiState>,
    Json(call): Json<SignedCall>,
) -> Result<Json<OperationResponse>, ApiError> {
    let (caller, req): (_, IdentityPayload) =
        state.authenticate(&call, operation::ADD_ADMINISTRATOR).await?;
    state.service.add_administrator(caller, req.identity).await?;
    info!("Administrator {} added by {}", req.identity.short(), caller.short());
    Ok(Json(OperationResponse::ok(format!(
        "{} is an administrator",
        req.identity
    ))))
}

pub async fn remove_administrator(
    State(state): State<ApiState>,
    Json(call): Json<SignedCall>,
) -> Result<Json<OperationResponse>, ApiError> {
    let (caller, req): (_, IdentityPayload) =
        state.authenticate(&call, operation::REMOVE_ADMINISTRATOR).await?;
    state
        .service
        .remove_administrator(caller, req.identity)
        .await?;
    info!("Administrator {} removed by {}", req.identity.short(), caller.short());
    Ok(Json(OperationResponse::ok(format!(
        "{} is not an administrator",
        req.identity
    ))))
}

pub async fn set_threshold(
    State(state): State<ApiState>,
    Json(call): Json<SignedCall>,
) -> Result<Json<OperationResponse>, ApiError> {
    let (caller, req): (_, SetThresholdPayload) =
        state.authenticate(&call, operation::SET_THRESHOLD).await?;
    state.service.set_threshold(caller, req.ciphertext).await?;
    Ok(Json(OperationResponse::ok("threshold updated")))
}

/// Administrator-only read of the current (still encrypted) threshold
pub async fn get_threshold(
    State(state): State<ApiState>,
    Json(call): Json<SignedCall>,
) -> Result<Json<ThresholdResponse>, ApiError> {
    let (caller, _): (_, EmptyPayload) =
        state.authenticate(&call, operation::GET_THRESHOLD).await?;
    let ciphertext = state.service.get_threshold(caller).await?;
    Ok(Json(ThresholdResponse { ciphertext }))
}

// ============================================================================
// Transactions
// ============================================================================

pub async fn submit_transaction(
    State(state): State<ApiState>,
    Json(call): Json<SignedCall>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let (caller, req): (_, SubmitPayload) =
        state.authenticate(&call, operation::SUBMIT).await?;
    let transaction_id = state.service.submit(caller, req.amount_ciphertext).await?;
    Ok(Json(SubmitResponse { transaction_id }))
}

pub async fn get_transaction(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<Json<TransactionView>, ApiError> {
    Ok(Json(state.service.transaction(id).await?))
}

/// Transactions submitted by one participant
pub async fn list_transactions(
    State(state): State<ApiState>,
    Query(query): Query<TransactionsQuery>,
) -> Json<Vec<TransactionView>> {
    Json(state.service.transactions_by(query.submitter).await)
}

pub async fn get_encrypted_amount(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<Json<AmountResponse>, ApiError> {
    let amount_ciphertext = state.service.encrypted_amount(id).await?;
    Ok(Json(AmountResponse {
        transaction_id: id,
        amount_ciphertext,
    }))
}

pub async fn get_encrypted_flag(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<Json<FlagResponse>, ApiError> {
    let suspicious_ciphertext = state.service.encrypted_flag(id).await?;
    Ok(Json(FlagResponse {
        transaction_id: id,
        suspicious_ciphertext,
    }))
}

// ============================================================================
// Disclosure
// ============================================================================

pub async fn request_disclosure(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
    Json(call): Json<SignedCall>,
) -> Result<Json<DisclosureResponse>, ApiError> {
    let (caller, req): (_, DisclosurePayload) =
        state.authenticate(&call, operation::REQUEST_DISCLOSURE).await?;
    if req.transaction_id != id {
        return Err(ApiError::BadRequest(format!(
            "signed transaction id {} does not match path id {}",
            req.transaction_id, id
        )));
    }

    let request_id = state.service.request_disclosure(caller, id).await?;
    Ok(Json(DisclosureResponse {
        transaction_id: id,
        request_id,
    }))
}

/// Engine callback. Unauthenticated: only the proof decides.
pub async fn disclosure_callback(
    State(state): State<ApiState>,
    Json(disclosure): Json<Disclosure>,
) -> Result<Json<DisclosedResult>, ApiError> {
    Ok(Json(state.service.deliver(disclosure).await?))
}

// ============================================================================
// Events
// ============================================================================

pub async fn list_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let events = state.service.events_since(query.since).await;
    let last_seq = state.service.stats().await.events;
    Json(EventsResponse { events, last_seq })
}
