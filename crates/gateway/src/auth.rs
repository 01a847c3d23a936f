//! Login and session-token middleware.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pinchat_core::error::{AuthError, Error};
use pinchat_core::message::{Message, Sender};
use pinchat_security::{AuditEvent, AuditOutcome, Pin};

use crate::GatewayState;
use crate::error::{ApiError, MSG_LOGIN_FAILED};

/// Custom header carrying the session token.
pub const AUTH_HEADER: &str = "x-auth-token";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub pin: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub history: Vec<HistoryItem>,
}

/// One stored message as the client renders it.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryItem {
    pub from: Sender,
    pub text: String,
    pub time: DateTime<Utc>,
}

impl From<Message> for HistoryItem {
    fn from(msg: Message) -> Self {
        Self {
            from: msg.sender,
            text: msg.text,
            time: msg.timestamp,
        }
    }
}

fn invalid_format(length: usize) -> Error {
    Error::InvalidFormat(format!("Please enter a valid {length}-digit PIN."))
}

/// `POST /api/auth/login`
pub async fn login_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    login(&state, payload)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(e, MSG_LOGIN_FAILED))
}

async fn login(
    state: &GatewayState,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<LoginResponse, Error> {
    // Anything but a JSON string of the right shape is a format error.
    let raw = payload
        .ok()
        .and_then(|Json(req)| req.pin)
        .and_then(|v| v.as_str().map(str::to_owned))
        .ok_or_else(|| invalid_format(state.pin_length))?;
    let pin = Pin::parse(&raw, state.pin_length).map_err(|e| {
        debug!(reason = %e, "Rejected PIN format");
        invalid_format(state.pin_length)
    })?;

    let Some(record) = state.resolver.resolve(&pin).await? else {
        state
            .audit
            .log(AuditEvent::Login, "anonymous", AuditOutcome::Denied, None);
        return Err(Error::InvalidCredential);
    };

    let token = state.sessions.issue(&record.id)?;
    let history = state
        .agent
        .conversations()
        .full_history(&record.id)
        .await?;

    state.audit.log(
        AuditEvent::Login,
        record.id.as_str(),
        AuditOutcome::Success,
        Some(format!("{} messages in history", history.len())),
    );
    info!(identity = %record.id, messages = history.len(), "Login succeeded");

    Ok(LoginResponse {
        success: true,
        token,
        history: history.into_iter().map(HistoryItem::from).collect(),
    })
}

/// Token from `x-auth-token`, falling back to `Authorization: Bearer`.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let custom = headers
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty());

    custom.or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })
}

/// Verify the session token and attach the [`pinchat_security::Session`]
/// to the request extensions.
pub async fn require_session(
    State(state): State<Arc<GatewayState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let verified = match extract_token(req.headers()) {
        None => Err(AuthError::MissingToken),
        Some(token) => state.sessions.verify(token),
    };

    match verified {
        Ok(session) => {
            req.extensions_mut().insert(session);
            Ok(next.run(req).await)
        }
        Err(err) => {
            state.audit.log(
                AuditEvent::TokenCheck,
                "anonymous",
                AuditOutcome::Denied,
                Some(err.to_string()),
            );
            Err(err.into())
        }
    }
}
