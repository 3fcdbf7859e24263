pub mod config;
pub mod ollama_client;
