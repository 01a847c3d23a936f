//! Credential handling for PinChat: PIN hashing, identity resolution,
//! session tokens, and audit logging.
//!
//! Provides:
//! - **PINs**: Format validation and Argon2id hashing
//! - **Resolution**: Map a plaintext PIN to its stored record
//! - **Sessions**: Issue and verify 24-hour HS256 tokens
//! - **Audit logging**: Structured login and token events

pub mod audit;
pub mod pin;
pub mod resolver;
pub mod session;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
pub use pin::{HashError, Pin, PinFormatError, PinHasher};
pub use resolver::IdentityResolver;
pub use session::{SESSION_TTL_HOURS, Session, SessionManager};
