use crate::terminal::{TerminalDisplay, TerminalInput};
use anyhow::Context;
use application::chat::ChatConversation;
use application::ports::{DisplaySurface, InputSource, Prompt};
use application::session_loop::SessionLoop;
use clap::Parser;
use colored::Colorize;
use domain::{InferenceProvider, SessionConfig, SessionError, StreamingResponse};
use infrastructure::config::Config;
use infrastructure::ollama_client::OllamaClient;
use shared::confirmation::ask_confirmation;
use shared::types::Result;
use shared::utils::is_blank;
use std::path::PathBuf;

const CHAT_HELP: &str =
    "Commands: /clear, /model NAME, /temperature 0.0-1.0, /system TEXT, /exit. Anything else is sent to the model.";

fn parse_temperature(raw: &str) -> std::result::Result<f32, String> {
    let value: f32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("temperature must be between 0.0 and 1.0, got {}", value))
    }
}

#[derive(Parser, Debug)]
#[command(name = "devassist")]
#[command(about = "Debugging assistant powered by a local Ollama model", long_about = None)]
#[command(after_help = "When stdin is piped, each answer is a paragraph: lines up to the next blank line.")]
pub struct Cli {
    /// Free-form chat instead of the guided code/error debugging flow
    #[arg(long)]
    pub chat: bool,

    /// Model to use (defaults to $LLM_MODEL, then llama3)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature between 0.0 and 1.0
    #[arg(short, long, value_parser = parse_temperature)]
    pub temperature: Option<f32>,

    /// Ollama server URL (defaults to $OLLAMA_BASE_URL, then http://localhost:11434)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Read the system instructions from a file
    #[arg(long)]
    pub system_file: Option<PathBuf>,

    /// Log requests and turn timings to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Slash commands understood by chat mode.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    Clear,
    Model(String),
    Temperature(f32),
    System(String),
    Exit,
    Help,
    Invalid(String),
}

impl ChatCommand {
    /// `None` when the text is a message for the model.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let command = match name {
            "clear" => ChatCommand::Clear,
            "exit" | "quit" => ChatCommand::Exit,
            "help" => ChatCommand::Help,
            "model" if !arg.is_empty() => ChatCommand::Model(arg.to_string()),
            "model" => ChatCommand::Invalid("usage: /model NAME".to_string()),
            "system" | "persona" if !arg.is_empty() => ChatCommand::System(arg.to_string()),
            "system" | "persona" => ChatCommand::Invalid("usage: /system TEXT".to_string()),
            "temperature" | "temp" => match parse_temperature(arg) {
                Ok(value) => ChatCommand::Temperature(value),
                Err(err) => ChatCommand::Invalid(err),
            },
            other => ChatCommand::Invalid(format!("unknown command /{}", other)),
        };
        Some(command)
    }
}

pub struct CliApp {
    config: Config,
    client: OllamaClient,
}

impl CliApp {
    pub fn new(config: Config) -> Self {
        let client = OllamaClient::from_config(&config);
        Self { config, client }
    }

    /// Loads `.env` and the environment, then applies the flags on top.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let system_instructions = match &cli.system_file {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read system instructions from {:?}", path))?,
            ),
            None => None,
        };
        let config = Config::load()?.with_overrides(
            cli.model.clone(),
            cli.temperature,
            cli.base_url.clone(),
            system_instructions,
        );
        Ok(Self::new(config))
    }

    pub async fn run(&self, cli: Cli) -> Result<()> {
        let session_config = self.config.session_config()?;
        tracing::info!(
            model = %session_config.model,
            url = %self.client.base_url(),
            chat = cli.chat,
            "starting"
        );
        if cli.chat {
            self.handle_chat(session_config).await
        } else {
            self.handle_debug(session_config).await
        }
    }

    async fn handle_debug(&self, session_config: SessionConfig) -> Result<()> {
        let mut session_loop = SessionLoop::new(
            self.client.clone(),
            TerminalInput::detect()?,
            TerminalDisplay::new(),
            session_config,
        );
        session_loop.run().await
    }

    async fn handle_chat(&self, session_config: SessionConfig) -> Result<()> {
        let mut chat = ChatConversation::new(session_config)?;
        let mut input = TerminalInput::detect()?;
        let mut display = TerminalDisplay::new();
        println!(
            "{} {}",
            format!("Chatting with {}.", chat.settings().model).cyan().bold(),
            CHAT_HELP.dimmed()
        );

        while let Some(text) = input.read_text(Prompt::Chat)? {
            if is_blank(&text) {
                continue;
            }
            match ChatCommand::parse(&text) {
                Some(ChatCommand::Exit) => break,
                Some(command) => self.apply_command(&mut chat, command)?,
                None => {
                    display.analyzing();
                    if let Err(err) = chat_turn(&mut chat, &self.client, &mut display, text).await {
                        tracing::warn!(error = %err, "chat turn failed");
                        display.turn_failed(&err);
                    }
                }
            }
        }
        display.farewell();
        Ok(())
    }

    fn apply_command(&self, chat: &mut ChatConversation, command: ChatCommand) -> Result<()> {
        let updated = match command {
            ChatCommand::Clear => {
                if ask_confirmation("Clear the conversation?", true)? {
                    chat.clear()?;
                    println!("{}", "Conversation cleared.".green());
                }
                return Ok(());
            }
            ChatCommand::Model(model) => chat.settings().clone().with_model(model),
            ChatCommand::Temperature(value) => chat.settings().clone().with_temperature(value),
            ChatCommand::System(text) => chat.settings().clone().with_system_instructions(text),
            ChatCommand::Help => {
                println!("{}", CHAT_HELP.dimmed());
                return Ok(());
            }
            ChatCommand::Invalid(reason) => {
                println!("{} {}", reason.red(), CHAT_HELP.dimmed());
                return Ok(());
            }
            ChatCommand::Exit => return Ok(()),
        };
        match chat.update_settings(updated) {
            Ok(()) => println!(
                "{}",
                format!(
                    "Next turn uses {} at temperature {}.",
                    chat.settings().model,
                    chat.settings().temperature
                )
                .green()
            ),
            Err(err) => println!("{} {}", "Error:".red().bold(), err.to_string().red()),
        }
        Ok(())
    }
}

async fn chat_turn<P, D>(
    chat: &mut ChatConversation,
    provider: &P,
    display: &mut D,
    text: String,
) -> std::result::Result<(), SessionError>
where
    P: InferenceProvider,
    D: DisplaySurface,
{
    let acc = chat.send(provider, text).await?;
    let drained: std::result::Result<StreamingResponse, SessionError> = acc
        .drain(|update| {
            if !update.is_final {
                display.partial(update.text);
            }
        })
        .await;
    match drained {
        Ok(response) => {
            display.finished(response.text());
            chat.finish(response)
        }
        Err(err) => {
            chat.abandon();
            Err(err)
        }
    }
}
