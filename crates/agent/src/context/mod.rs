//! Context assembly: stored messages to model input.

pub mod assembler;

pub use assembler::{
    AssembledContext, AssemblyMetadata, ContextAssembler, DEFAULT_MAX_MESSAGES, DropInfo,
    DropReason,
};
