use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use cipherscreen_engine::{Disclosure, ReferenceEngine, seal_u64};
use cipherscreen_identity::{Keypair, SignedCall};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

use super::types::*;
use super::{ApiState, SharedEngine, create_router};
use crate::protocol::{DisclosedResult, DisclosureState, ScreeningLedger, TransactionView};
use crate::relay::DisclosureSource;
use crate::service::LedgerService;

struct TestNode {
    router: Router,
    engine: Arc<ReferenceEngine>,
    admin: Keypair,
    nonce: u64,
}

impl TestNode {
    fn new() -> Self {
        let engine = Arc::new(ReferenceEngine::new(2, 3).unwrap());
        let admin = Keypair::generate();
        let shared: SharedEngine = engine.clone();
        let ledger = ScreeningLedger::new(shared, [admin.identity()]).unwrap();
        let state = ApiState::new(LedgerService::new(ledger), Some(engine.public_info()));
        Self {
            router: create_router(state),
            engine,
            admin,
            nonce: 0,
        }
    }

    fn sign<T: Serialize>(&mut self, op: &str, signer: &Keypair, payload: &T) -> SignedCall {
        self.nonce += 1;
        signer.sign_call(op, self.nonce, payload).unwrap()
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn post<B: Serialize>(&self, uri: &str, body: &B) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        self.send(req).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(req).await
    }

    /// Admits a fresh bank and sets the threshold.
    async fn with_bank(&mut self, threshold: u64) -> Keypair {
        let bank = Keypair::generate();
        let admin = self.admin.clone();

        let call = self.sign(operation::ADMIT, &admin, &IdentityPayload { identity: bank.identity() });
        assert_eq!(self.post("/admin/participants", &call).await.0, StatusCode::OK);

        let ciphertext = seal_u64(threshold, self.engine.committee()).unwrap();
        let call = self.sign(operation::SET_THRESHOLD, &admin, &SetThresholdPayload { ciphertext });
        assert_eq!(self.post("/admin/threshold", &call).await.0, StatusCode::OK);
        bank
    }

    async fn submit(&mut self, bank: &Keypair, amount: u64) -> u64 {
        let amount_ciphertext = seal_u64(amount, self.engine.committee()).unwrap();
        let call = self.sign(operation::SUBMIT, bank, &SubmitPayload { amount_ciphertext });
        let (status, body) = self.post("/transactions", &call).await;
        assert_eq!(status, StatusCode::OK);
        decode::<SubmitResponse>(&body).transaction_id
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap()
}

fn error_code(body: &[u8]) -> String {
    decode::<ErrorResponse>(body).code
}

#[tokio::test]
async fn health_and_committee_are_public() {
    let node = TestNode::new();

    let (status, body) = node.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = decode(&body);
    assert!(health.healthy);
    assert_eq!(health.transactions, 0);

    let (status, body) = node.get("/engine/committee").await;
    assert_eq!(status, StatusCode::OK);
    let info: cipherscreen_engine::EnginePublicInfo = decode(&body);
    assert_eq!(info.committee.config.threshold, 2);
    assert_eq!(info.attestation_key, node.engine.attestation_key());
}

#[tokio::test]
async fn end_to_end_over_http() {
    let mut node = TestNode::new();
    let bank = node.with_bank(10_000).await;
    let id = node.submit(&bank, 12_500).await;
    assert_eq!(id, 1);

    let (status, body) = node.get("/transactions/1/flag").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decode::<FlagResponse>(&body).transaction_id, 1);

    let call = node.sign(operation::REQUEST_DISCLOSURE, &bank, &DisclosurePayload { transaction_id: id });
    let (status, body) = node.post("/transactions/1/disclosure", &call).await;
    assert_eq!(status, StatusCode::OK);
    let requested: DisclosureResponse = decode(&body);

    let disclosure = node.engine.poll_disclosures().unwrap().pop().unwrap();
    assert_eq!(disclosure.request_id, requested.request_id);

    let (status, body) = node.post("/engine/callback", &disclosure).await;
    assert_eq!(status, StatusCode::OK);
    let result: DisclosedResult = decode(&body);
    assert!(result.value);

    let (_, body) = node.get("/transactions/1").await;
    let view: TransactionView = decode(&body);
    assert_eq!(view.disclosure, DisclosureState::Disclosed { value: true });

    // Replay of the callback
    let (status, body) = node.post("/engine/callback", &disclosure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "UNKNOWN_REQUEST");

    let (_, body) = node.get("/events?since=2").await;
    let events: EventsResponse = decode(&body);
    assert_eq!(events.events.len(), 3);
    assert_eq!(events.last_seq, 5);
}

#[tokio::test]
async fn forged_callback_is_rejected_and_retry_succeeds() {
    let mut node = TestNode::new();
    let bank = node.with_bank(100).await;
    let id = node.submit(&bank, 5).await;

    let call = node.sign(operation::REQUEST_DISCLOSURE, &bank, &DisclosurePayload { transaction_id: id });
    node.post(&format!("/transactions/{id}/disclosure"), &call).await;
    let genuine = node.engine.poll_disclosures().unwrap().pop().unwrap();

    let forged = Disclosure {
        cleartext: vec![1],
        ..genuine.clone()
    };
    let (status, body) = node.post("/engine/callback", &forged).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "INVALID_PROOF");

    let (status, body) = node.post("/engine/callback", &genuine).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!decode::<DisclosedResult>(&body).value);
}

#[tokio::test]
async fn other_bank_is_forbidden() {
    let mut node = TestNode::new();
    let bank_a = node.with_bank(100).await;
    let bank_b = node.with_bank(100).await;
    let id = node.submit(&bank_a, 500).await;

    let call = node.sign(operation::REQUEST_DISCLOSURE, &bank_b, &DisclosurePayload { transaction_id: id });
    let (status, body) = node.post(&format!("/transactions/{id}/disclosure"), &call).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");
}

#[tokio::test]
async fn signed_id_must_match_path() {
    let mut node = TestNode::new();
    let bank = node.with_bank(100).await;
    node.submit(&bank, 1).await;
    node.submit(&bank, 2).await;

    let call = node.sign(operation::REQUEST_DISCLOSURE, &bank, &DisclosurePayload { transaction_id: 2 });
    let (status, _) = node.post("/transactions/1/disclosure", &call).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submit_before_threshold_and_by_outsider() {
    let mut node = TestNode::new();
    let bank = Keypair::generate();
    let admin = node.admin.clone();
    let call = node.sign(operation::ADMIT, &admin, &IdentityPayload { identity: bank.identity() });
    node.post("/admin/participants", &call).await;

    let amount_ciphertext = seal_u64(1, node.engine.committee()).unwrap();
    let call = node.sign(operation::SUBMIT, &bank, &SubmitPayload { amount_ciphertext: amount_ciphertext.clone() });
    let (status, body) = node.post("/transactions", &call).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(error_code(&body), "THRESHOLD_NOT_CONFIGURED");

    let outsider = Keypair::generate();
    let call = node.sign(operation::SUBMIT, &outsider, &SubmitPayload { amount_ciphertext });
    let (status, body) = node.post("/transactions", &call).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "UNAUTHORIZED");
}

#[tokio::test]
async fn tampered_and_replayed_calls_are_rejected() {
    let mut node = TestNode::new();
    let admin = node.admin.clone();
    let target = Keypair::generate().identity();

    let call = node.sign(operation::ADMIT, &admin, &IdentityPayload { identity: target });
    let mut tampered = call.clone();
    tampered.payload = serde_json::json!({ "identity": Keypair::generate().identity() });
    let (status, body) = node.post("/admin/participants", &tampered).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "BAD_SIGNATURE");

    assert_eq!(node.post("/admin/participants", &call).await.0, StatusCode::OK);
    let (status, body) = node.post("/admin/participants", &call).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "STALE_NONCE");
}

#[tokio::test]
async fn threshold_read_is_admin_only() {
    let mut node = TestNode::new();
    let bank = node.with_bank(42).await;
    let admin = node.admin.clone();

    let call = node.sign(operation::GET_THRESHOLD, &admin, &EmptyPayload {});
    let (status, body) = node.post("/admin/threshold/get", &call).await;
    assert_eq!(status, StatusCode::OK);
    let threshold: ThresholdResponse = decode(&body);
    assert!(!threshold.ciphertext.as_bytes().is_empty());

    let call = node.sign(operation::GET_THRESHOLD, &bank, &EmptyPayload {});
    let (status, _) = node.post("/admin/threshold/get", &call).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn last_administrator_stays() {
    let mut node = TestNode::new();
    let admin = node.admin.clone();
    let call = node.sign(operation::REMOVE_ADMINISTRATOR, &admin, &IdentityPayload { identity: admin.identity() });
    let (status, body) = node.post("/admin/administrators/remove", &call).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "LAST_ADMINISTRATOR");

    let second = Keypair::generate();
    let call = node.sign(operation::ADD_ADMINISTRATOR, &admin, &IdentityPayload { identity: second.identity() });
    assert_eq!(node.post("/admin/administrators", &call).await.0, StatusCode::OK);
    let call = node.sign(operation::REMOVE_ADMINISTRATOR, &second, &IdentityPayload { identity: admin.identity() });
    assert_eq!(
        node.post("/admin/administrators/remove", &call).await.0,
        StatusCode::OK
    );
}

#[tokio::test]
async fn unknown_transaction_is_not_found() {
    let node = TestNode::new();
    let (status, body) = node.get("/transactions/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn envelope_cannot_be_redirected_to_another_endpoint() {
    let mut node = TestNode::new();
    let admin = node.admin.clone();
    let bank = Keypair::generate();

    // Signed to admit the bank, posted to the administrator endpoints instead
    let call = node.sign(operation::ADMIT, &admin, &IdentityPayload { identity: bank.identity() });
    for uri in ["/admin/administrators", "/admin/administrators/remove"] {
        let (status, body) = node.post(uri, &call).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "BAD_SIGNATURE");
    }

    // Relabelling the envelope breaks the signature
    let mut relabelled = call.clone();
    relabelled.operation = operation::ADD_ADMINISTRATOR.into();
    let (status, _) = node.post("/admin/administrators", &relabelled).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The bank never became an administrator
    let call = node.sign(operation::ADMIT, &bank, &IdentityPayload { identity: bank.identity() });
    let (status, body) = node.post("/admin/participants", &call).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "UNAUTHORIZED");

    // The original envelope still works where it was meant to go
    let call = node.sign(operation::ADMIT, &admin, &IdentityPayload { identity: bank.identity() });
    assert_eq!(node.post("/admin/participants", &call).await.0, StatusCode::OK);
}

#[tokio::test]
async fn payloads_with_unknown_fields_are_rejected() {
    let mut node = TestNode::new();
    node.with_bank(42).await;
    let admin = node.admin.clone();

    let call = node.sign(
        operation::GET_THRESHOLD,
        &admin,
        &serde_json::json!({ "identity": admin.identity() }),
    );
    let (status, body) = node.post("/admin/threshold/get", &call).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "BAD_REQUEST");
}

#[tokio::test]
async fn malformed_payload_does_not_burn_the_nonce() {
    let mut node = TestNode::new();
    let admin = node.admin.clone();
    let target = Keypair::generate().identity();

    let bad = admin
        .sign_call(operation::ADMIT, 10, &serde_json::json!({ "who": target }))
        .unwrap();
    let (status, _) = node.post("/admin/participants", &bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Same nonce, well-formed body
    let good = admin
        .sign_call(operation::ADMIT, 10, &IdentityPayload { identity: target })
        .unwrap();
    assert_eq!(node.post("/admin/participants", &good).await.0, StatusCode::OK);
}

#[tokio::test]
async fn amount_and_submitter_reads() {
    let mut node = TestNode::new();
    let bank_a = node.with_bank(100).await;
    let bank_b = node.with_bank(100).await;
    node.submit(&bank_a, 10).await;
    node.submit(&bank_b, 20).await;
    node.submit(&bank_a, 30).await;

    let (status, body) = node.get("/transactions/2/amount").await;
    assert_eq!(status, StatusCode::OK);
    let amount: AmountResponse = decode(&body);
    assert_eq!(amount.transaction_id, 2);
    assert!(!amount.amount_ciphertext.as_bytes().is_empty());

    let (status, body) = node.get("/transactions/9/amount").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");

    let (status, body) = node
        .get(&format!("/transactions?submitter={}", bank_a.identity()))
        .await;
    assert_eq!(status, StatusCode::OK);
    let views: Vec<TransactionView> = decode(&body);
    assert_eq!(views.iter().map(|v| v.id).collect::<Vec<_>>(), vec![1, 3]);
    assert!(views.iter().all(|v| v.submitter == bank_a.identity()));
}
