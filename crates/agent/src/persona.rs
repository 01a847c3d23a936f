//! The assistant persona: the fixed system instruction sent with every call.

use pinchat_config::ChatConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    instruction: String,
}

impl Persona {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into().trim().to_string(),
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.system_prompt.as_str())
    }

    /// The system instruction. Empty means none is sent.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}
