use application::ports::{DisplaySurface, InputSource, Prompt};
use colored::Colorize;
use crossterm::terminal;
use crossterm::tty::IsTty;
use domain::SessionError;
use rustyline::error::ReadlineError;
use rustyline::{Cmd, DefaultEditor, EventHandler, KeyCode, KeyEvent, Modifiers};
use shared::types::Result;
use std::io::{self, BufRead, Write};

const INPUT_HINT: &str =
    "(Press Enter to submit. Press Esc+Enter or Alt+Enter to add a new line without submitting)";

/// Reads prompts with a line editor, or paragraph by paragraph when stdin is
/// piped.
pub struct TerminalInput {
    editor: Option<DefaultEditor>,
}

impl TerminalInput {
    pub fn detect() -> Result<Self> {
        let editor = if io::stdin().is_tty() {
            let mut editor = DefaultEditor::new()?;
            // terminals report Esc followed by Enter as Alt+Enter
            editor.bind_sequence(
                KeyEvent(KeyCode::Enter, Modifiers::ALT),
                EventHandler::Simple(Cmd::Newline),
            );
            Some(editor)
        } else {
            None
        };
        Ok(Self { editor })
    }
}

fn read_edited(editor: &mut DefaultEditor) -> Result<Option<String>> {
    match editor.readline("> ") {
        Ok(text) => {
            if !text.trim().is_empty() {
                editor.add_history_entry(text.as_str())?;
            }
            Ok(Some(text))
        }
        Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// One piped submission: every line up to the next blank line. A blank line
/// on its own submits empty text; `None` once the input is exhausted.
pub fn read_paragraph<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(if lines.is_empty() {
                None
            } else {
                Some(lines.join("\n"))
            });
        }
        let text = line.trim_end_matches(['\r', '\n']);
        if text.trim().is_empty() {
            return Ok(Some(lines.join("\n")));
        }
        lines.push(text.to_string());
    }
}

impl InputSource for TerminalInput {
    fn read_text(&mut self, prompt: Prompt) -> Result<Option<String>> {
        println!("\n{}", prompt.instruction().green().bold());
        match self.editor.as_mut() {
            Some(editor) => {
                println!("{}", INPUT_HINT.dimmed());
                read_edited(editor)
            }
            None => Ok(read_paragraph(&mut io::stdin().lock())?),
        }
    }
}

/// What to write for the latest reply buffer, given what is already on screen.
#[derive(Debug, PartialEq, Eq)]
enum Echo<'a> {
    Append(&'a str),
    /// The buffer no longer extends the printed text.
    Restart(&'a str),
}

fn echo<'a>(printed: &str, text: &'a str) -> Echo<'a> {
    match text.strip_prefix(printed) {
        Some(rest) => Echo::Append(rest),
        None => Echo::Restart(text),
    }
}

/// Prints replies as they stream in, writing only the newly arrived suffix
/// of each buffer.
pub struct TerminalDisplay {
    printed: String,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self {
            printed: String::new(),
        }
    }

    fn write_suffix(&mut self, text: &str) {
        match echo(&self.printed, text) {
            Echo::Append(rest) => {
                print!("{}", rest);
                self.printed.push_str(rest);
            }
            Echo::Restart(text) => {
                println!();
                print!("{}", text);
                self.printed = text.to_string();
            }
        }
        let _ = io::stdout().flush();
    }

    fn rule(title: &str) -> String {
        let width = terminal::size().map(|(w, _)| w as usize).unwrap_or(80);
        let label = format!(" {} ", title);
        let side = width.saturating_sub(label.chars().count()) / 2;
        format!("{}{}{}", "─".repeat(side), label, "─".repeat(side))
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySurface for TerminalDisplay {
    fn session_started(&mut self) {
        println!("\n{}", Self::rule("New Debugging Session").blue().bold());
    }

    fn analyzing(&mut self) {
        println!("\n{}", "🔍 Analyzing...".cyan().bold());
        self.printed.clear();
    }

    fn partial(&mut self, text: &str) {
        self.write_suffix(text);
    }

    fn finished(&mut self, text: &str) {
        self.write_suffix(text);
        println!();
        println!("\n{}", "-".repeat(40));
        self.printed.clear();
    }

    fn turn_failed(&mut self, error: &SessionError) {
        if !self.printed.is_empty() {
            println!();
        }
        self.printed.clear();
        println!("{} {}", "Error:".red().bold(), error.to_string().red());
        if error.partial_text().is_some() {
            println!(
                "{}",
                "The partial reply above was not added to the conversation.".yellow()
            );
        }
        if let Some(hint) = error.guidance() {
            println!("{}", hint.yellow());
        }
    }

    fn farewell(&mut self) {
        println!("{}", "Goodbye!".dimmed());
    }
}
