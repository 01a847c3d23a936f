//! Session tokens: HS256 JWTs carrying the resolved identity.
//!
//! Tokens are not stored server-side. A token is valid from issue until
//! `exp`, 24 hours later; there is no revocation, so logging out means the
//! client discards its token.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use pinchat_config::SessionConfig;
use pinchat_core::error::{AuthError, Error};
use pinchat_core::identity::IdentityId;

/// Fixed lifetime of a session token.
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// A verified session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: IdentityId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies session tokens with a shared secret.
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionManager {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, Error> {
        match config.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(Self::new(secret)),
            _ => Err(Error::Config {
                message: "session.jwt_secret (JWT_SECRET) is not set".into(),
            }),
        }
    }

    /// Issue a token for `identity`, valid for [`SESSION_TTL_HOURS`].
    pub fn issue(&self, identity: &IdentityId) -> Result<String, Error> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, identity: &IdentityId, now: DateTime<Utc>) -> Result<String, Error> {
        let claims = Claims {
            sub: identity.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(SESSION_TTL_HOURS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("Failed to sign session token: {e}")))
    }

    /// Verify signature and expiry. A valid signature on an expired token
    /// yields [`AuthError::Expired`]; anything else wrong is
    /// [`AuthError::InvalidToken`].
    pub fn verify(&self, token: &str) -> Result<Session, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                other => AuthError::InvalidToken(format!("{other:?}")),
            }
        })?;

        let claims = data.claims;
        let issued_at = Utc
            .timestamp_opt(claims.iat, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidToken("iat out of range".into()))?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidToken("exp out of range".into()))?;

        Ok(Session {
            identity: IdentityId(claims.sub),
            issued_at,
            expires_at,
        })
    }
}
