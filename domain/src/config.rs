use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use shared::utils::is_blank;

pub const DEFAULT_MODEL: &str = "llama3";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a Senior Software Engineer and Expert Debugger.\n\
Your goal is to help the user fix their code.\n\
Follow this structure in your response:\n\
1. **Analysis**: Concisely explain the root cause.\n\
2. **Fix**: Provide the corrected code block.\n\
3. **Prevention**: One short tip to avoid this in the future.\n\
Use Markdown filtering for code blocks.";

/// Model, sampling and persona settings for one session.
///
/// The core only ever receives this as a value; sourcing it from the
/// environment or the command line is the front end's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub model: String,
    pub temperature: f32,
    pub system_instructions: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            system_instructions: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.system_instructions = instructions.into();
        self
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if is_blank(&self.model) {
            return Err(SessionError::Configuration(
                "model identifier must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(SessionError::Configuration(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            )));
        }
        if is_blank(&self.system_instructions) {
            return Err(SessionError::Configuration(
                "system instructions must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
