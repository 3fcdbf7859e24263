use crate::types::Result;
use crossterm::tty::IsTty;
use dialoguer::{theme::ColorfulTheme, Confirm};

/// Standardized confirmation prompt used across binaries.
///
/// Falls back to `default_yes` when stdin is not a terminal, so piped
/// sessions never block on a prompt nobody can answer.
pub fn ask_confirmation(prompt: &str, default_yes: bool) -> Result<bool> {
    if !std::io::stdin().is_tty() {
        return Ok(default_yes);
    }
    let choice = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default_yes)
        .show_default(true)
        .interact()?;
    Ok(choice)
}
