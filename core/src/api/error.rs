use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cipherscreen_engine::EngineError;
use cipherscreen_identity::IdentityError;
use log::{error, warn};
use thiserror::Error;

use super::types::ErrorResponse;
use crate::protocol::ProtocolError;

/// Everything a handler can fail with
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// HTTP status for a protocol rejection
pub fn protocol_status(e: &ProtocolError) -> StatusCode {
    match e {
        ProtocolError::Unauthorized { .. } | ProtocolError::Forbidden(_) => StatusCode::FORBIDDEN,
        ProtocolError::NotFound(_) | ProtocolError::UnknownRequest(_) => StatusCode::NOT_FOUND,
        ProtocolError::ThresholdNotConfigured => StatusCode::PRECONDITION_FAILED,
        ProtocolError::AlreadyDisclosed(_)
        | ProtocolError::DisclosurePending(_)
        | ProtocolError::LastAdministrator => StatusCode::CONFLICT,
        ProtocolError::InvalidProof(_) | ProtocolError::MalformedCleartext(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ProtocolError::Engine(EngineError::InvalidCiphertext(_)) => StatusCode::BAD_REQUEST,
        ProtocolError::Engine(EngineError::Unavailable) => StatusCode::SERVICE_UNAVAILABLE,
        ProtocolError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Protocol(e) => {
                let status = protocol_status(&e);
                if status.is_server_error() {
                    error!("Engine failure: {}", e);
                }
                (status, ErrorResponse::new(e.to_string(), e.code()))
            }
            ApiError::Identity(e) => {
                let (status, code) = match &e {
                    IdentityError::BadSignature | IdentityError::InvalidVerifyingKey => {
                        (StatusCode::UNAUTHORIZED, "BAD_SIGNATURE")
                    }
                    IdentityError::StaleNonce { .. } => (StatusCode::CONFLICT, "STALE_NONCE"),
                    IdentityError::InvalidEncoding(_) | IdentityError::Payload(_) => {
                        (StatusCode::BAD_REQUEST, "BAD_REQUEST")
                    }
                };
                warn!("Rejected signed call: {}", e);
                (status, ErrorResponse::new(e.to_string(), code))
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::bad_request(msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::not_found(msg)),
        };
        (status, Json(body)).into_response()
    }
}
