//! Mapping from domain errors to HTTP responses.
//!
//! Every error body is `{ "msg": ... }`, plus `details` for blocked turns.
//! Internal failures are logged here with their cause and answered with a
//! fixed, route-specific message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use pinchat_core::error::{AuthError, Error};

pub const MSG_INVALID_PIN: &str = "Invalid PIN.";
pub const MSG_NO_TOKEN: &str = "No token, authorization denied";
pub const MSG_BAD_TOKEN: &str = "Token is not valid";
pub const MSG_EXPIRED_TOKEN: &str = "Token is expired, please log in again";
pub const MSG_EMPTY_MESSAGE: &str = "Message cannot be empty.";
pub const MSG_BLOCKED: &str = "Message blocked by AI safety settings.";
pub const MSG_LOGIN_FAILED: &str = "Server error";
pub const MSG_CHAT_FAILED: &str = "Server error while processing chat message.";

/// Body of every non-2xx JSON response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                msg: msg.into(),
                details: None,
            },
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Map a domain error. `internal_msg` is what the client sees for
    /// store, provider, config and internal failures.
    pub fn from_error(err: Error, internal_msg: &'static str) -> Self {
        if err.is_internal() {
            error!(error = %err, "Request failed");
            return Self::new(StatusCode::INTERNAL_SERVER_ERROR, internal_msg);
        }

        match err {
            Error::InvalidFormat(msg) => Self::bad_request(msg),
            Error::InvalidCredential => Self::bad_request(MSG_INVALID_PIN),
            Error::Auth(auth) => auth.into(),
            Error::EmptyMessage => Self::bad_request(MSG_EMPTY_MESSAGE),
            Error::Blocked(feedback) => Self {
                status: StatusCode::BAD_REQUEST,
                body: ErrorBody {
                    msg: MSG_BLOCKED.into(),
                    details: Some(feedback.details),
                },
            },
            Error::Store(_) | Error::Provider(_) | Error::Config { .. } | Error::Internal(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, internal_msg)
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let msg = match err {
            AuthError::MissingToken => MSG_NO_TOKEN,
            AuthError::InvalidToken(_) => MSG_BAD_TOKEN,
            AuthError::Expired => MSG_EXPIRED_TOKEN,
        };
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
