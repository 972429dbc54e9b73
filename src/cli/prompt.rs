//! Terminal prompts and the master password source used by commands.

use crate::core::password::PasswordSource;
use crate::error::{Result as SafeResult, SafeError};
use anyhow::{bail, Context, Result};
use dialoguer::{Confirm, Input, Password};
use std::io::{self, BufRead};
use zeroize::Zeroizing;

/// Where a command gets the master password from.
#[derive(Debug)]
pub enum MasterPassword {
    /// Hidden terminal prompt; `confirm` asks twice (new safes).
    Prompt { prompt: String, confirm: bool },
    /// First line of stdin (`--non-interactive`).
    Stdin,
}

impl PasswordSource for MasterPassword {
    fn supply(&mut self) -> SafeResult<Zeroizing<String>> {
        match self {
            MasterPassword::Prompt { prompt, confirm } => {
                let mut input = Password::new().with_prompt(prompt.as_str());
                if *confirm {
                    input = input.with_confirmation("Confirm password", "Passwords do not match");
                }
                input
                    .interact()
                    .map(Zeroizing::new)
                    .map_err(|e| SafeError::PasswordSource(e.to_string()))
            }
            MasterPassword::Stdin => read_stdin_line(&mut io::stdin().lock()),
        }
    }
}

fn read_stdin_line(reader: &mut dyn BufRead) -> SafeResult<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    reader
        .read_line(&mut line)
        .map_err(|e| SafeError::PasswordSource(format!("read stdin: {}", e)))?;
    let password = Zeroizing::new(line.trim_end_matches(['\r', '\n']).to_string());
    if password.is_empty() {
        return Err(SafeError::PasswordSource(
            "no master password on stdin".into(),
        ));
    }
    Ok(password)
}

/// Plain text field; fails in non-interactive mode.
pub fn input(non_interactive: bool, field: &str) -> Result<String> {
    if non_interactive {
        bail!("{} is required in non-interactive mode", field);
    }
    Input::<String>::new()
        .with_prompt(field)
        .interact_text()
        .with_context(|| format!("read {}", field))
}

/// Hidden field for a credential secret.
pub fn secret(non_interactive: bool, field: &str) -> Result<Zeroizing<String>> {
    if non_interactive {
        bail!("{} is required in non-interactive mode", field);
    }
    Password::new()
        .with_prompt(field)
        .interact()
        .map(Zeroizing::new)
        .with_context(|| format!("read {}", field))
}

/// Yes/no question; non-interactive mode takes the default.
pub fn confirm(non_interactive: bool, question: &str, default: bool) -> Result<bool> {
    if non_interactive {
        return Ok(default);
    }
    Confirm::new()
        .with_prompt(question)
        .default(default)
        .interact()
        .with_context(|| format!("read answer to '{}'", question))
}
