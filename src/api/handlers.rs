//! Thin HTTP handlers: decode the request DTO, call the core pipeline,
//! encode the response DTO. No business logic lives here.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

use super::types::{SettleRequest, SettleResponse, VerifyRequest, VerifyResponse};
use crate::adapters::Adapters;
use crate::capability::list_supported_kinds;
use crate::config::FacilitatorConfig;
use crate::pipeline::{settle_payment, verify_payment};
use crate::types::SupportedKinds;

pub struct AppState {
    pub adapters: Adapters,
    pub config: FacilitatorConfig,
}

pub async fn supported_handler() -> Json<SupportedKinds> {
    Json(list_supported_kinds())
}

pub async fn healthz_handler() -> &'static str {
    "ok"
}

pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyRequest>,
) -> Json<VerifyResponse> {
    let result = verify_payment(
        &state.adapters,
        &request.payment_payload,
        &request.payment_requirements,
    )
    .await;
    Json(result.into())
}

pub async fn settle_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SettleRequest>,
) -> Result<Json<SettleResponse>, StatusCode> {
    if let Some(expected) = &state.config.bearer_token {
        let presented = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    let result = settle_payment(
        &state.adapters,
        &request.payment_payload,
        &request.payment_requirements,
    )
    .await;
    Ok(Json(result.into()))
}
