use anyhow::Context;
use domain::config::{DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE};
use domain::SessionConfig;
use dotenvy::dotenv;
use shared::types::Result;
use std::env;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Process-level settings: `.env`, then the environment, then whatever the
/// command line overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub ollama_base_url: String,
    pub model: String,
    pub temperature: f32,
    pub system_instructions: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            system_instructions: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `load` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let temperature = match lookup("LLM_TEMPERATURE") {
            Some(raw) => raw
                .trim()
                .parse::<f32>()
                .with_context(|| format!("LLM_TEMPERATURE is not a number: {raw:?}"))?,
            None => defaults.temperature,
        };
        Ok(Self {
            ollama_base_url: lookup("OLLAMA_BASE_URL").unwrap_or(defaults.ollama_base_url),
            model: lookup("LLM_MODEL").unwrap_or(defaults.model),
            temperature,
            system_instructions: defaults.system_instructions,
        })
    }

    pub fn with_overrides(
        mut self,
        model: Option<String>,
        temperature: Option<f32>,
        base_url: Option<String>,
        system_instructions: Option<String>,
    ) -> Self {
        if let Some(model) = model {
            self.model = model;
        }
        if let Some(temperature) = temperature {
            self.temperature = temperature;
        }
        if let Some(base_url) = base_url {
            self.ollama_base_url = base_url;
        }
        if let Some(instructions) = system_instructions {
            self.system_instructions = instructions;
        }
        self
    }

    /// The validated value handed to the conversation core.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let config = SessionConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            system_instructions: self.system_instructions.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}
