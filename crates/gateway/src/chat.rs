//! Authenticated chat endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use pinchat_core::error::Error;
use pinchat_security::Session;

use crate::GatewayState;
use crate::error::{ApiError, MSG_CHAT_FAILED};

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    pub reply: String,
}

/// `POST /api/chat/send`
pub async fn send_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(session): Extension<Session>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError> {
    // A missing or non-string message counts as empty.
    let text = payload
        .ok()
        .and_then(|Json(req)| req.message)
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default();

    state
        .agent
        .reply(&session.identity, &text)
        .await
        .map(|reply| Json(SendResponse { reply }))
        .map_err(|e: Error| ApiError::from_error(e, MSG_CHAT_FAILED))
}
