//! The PinChat conversation pipeline.
//!
//! A chat turn flows **persist → window → assemble → call → persist**:
//!
//! 1. **Receive** an authenticated user's message
//! 2. **Store** it, then fetch the recent window for that identity
//! 3. **Assemble** the window into model history + the new turn
//! 4. **Send** one request to the configured provider
//! 5. **Store** the reply, or surface the provider's block signal

pub mod chat;
pub mod context;
pub mod persona;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use chat::ChatAgent;
pub use context::{AssembledContext, AssemblyMetadata, ContextAssembler, DropInfo, DropReason};
pub use persona::Persona;
