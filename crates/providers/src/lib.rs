//! Generative model providers for PinChat.
//!
//! All providers implement the `pinchat_core::Provider` trait.
//! [`build_from_config`] selects one based on configuration.

pub mod gemini;
pub mod router;

pub use gemini::{GeminiProvider, safety_settings};
pub use router::build_from_config;
