//! Error taxonomy for the facilitator's adapter boundaries.
//!
//! Business outcomes (insufficient balance, bad signature, ...) are *values*
//! (`InvalidReason`, see `types.rs`), never exceptions — this module only
//! covers genuine infrastructure failures (store I/O, a chain node timing
//! out, a malformed HTTP request) that the pipelines catch at their boundary
//! and fold into `unexpected_verify_error` / `unexpected_settle_error`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures from the embedded ledger store (`UtxoDb`/`AddressDb`).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("key not found: {0}")]
    NotFound(String),
}

/// Failures from the on-chain node client.
#[derive(Error, Debug)]
pub enum ChainClientError {
    #[error("chain client transport error: {0}")]
    Transport(String),

    #[error("chain client returned an unexpected response: {0}")]
    Unexpected(String),
}

/// Failures from the signature verification primitive.
#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("signature verifier error: {0}")]
    Unexpected(String),
}

/// Failures from the facilitator's own wallet (balance query, broadcast).
#[derive(Error, Debug)]
pub enum WalletAdapterError {
    #[error("wallet transport error: {0}")]
    Transport(String),

    #[error("wallet returned an unexpected response: {0}")]
    Unexpected(String),
}

/// Umbrella error for anything that can go wrong below the pipeline boundary.
///
/// `verify_payment`/`settle_payment` never propagate this type to their
/// caller: they catch it and report `unexpected_verify_error` /
/// `unexpected_settle_error` instead, per the closed `InvalidReason` set.
/// It surfaces directly only at the HTTP edge, for requests whose body could
/// not even be parsed into a `PaymentPayload`/`PaymentRequirements`.
#[derive(Error, Debug)]
pub enum FacilitatorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    ChainClient(#[from] ChainClientError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Wallet(#[from] WalletAdapterError),

    #[error("malformed request body: {0}")]
    MalformedRequest(String),
}

impl IntoResponse for FacilitatorError {
    fn into_response(self) -> Response {
        let status = match self {
            FacilitatorError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
