//! # PinChat Core
//!
//! Domain types, traits, and error definitions for the PinChat conversation
//! service. This crate has **zero framework dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the login/chat pipeline is defined as a trait here:
//! - [`PinStore`] and [`MessageStore`]: the durable record collections
//! - [`Provider`]: the external generative-language service
//!
//! Implementations live in their respective crates, so the pipeline can be
//! exercised end-to-end with in-memory stores and scripted providers.

pub mod error;
pub mod identity;
pub mod message;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{AuthError, Error, ProviderError, Result, StoreError};
pub use identity::{IdentityId, PinRecord};
pub use message::{Message, Sender, Turn, TurnRole};
pub use provider::{
    BlockFeedback, Completion, Provider, ProviderRequest, ProviderResponse, SafetySetting, Usage,
};
pub use store::{MessageStore, PinStore};
