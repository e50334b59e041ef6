// ABOUTME: Interactive prompts for collecting missing command-line arguments
// ABOUTME: Falls back to clear errors when no terminal is available

use anyhow::{bail, Context, Result};
use dialoguer::{Confirm, Input, Password, Select};
use std::io::IsTerminal;

#[derive(Debug, Clone, Copy)]
pub struct Prompter {
    is_tty: bool,
}

impl Prompter {
    pub fn new() -> Self {
        Self {
            is_tty: std::io::stdin().is_terminal() && std::io::stderr().is_terminal(),
        }
    }

    /// A prompter that never asks, for scripted and test use
    pub fn disabled() -> Self {
        Self { is_tty: false }
    }

    /// Check if interactive prompts should be used
    pub fn should_prompt(&self) -> bool {
        self.is_tty && !is_in_ci()
    }

    /// Use the flag value when given, otherwise ask
    pub fn text_or_prompt(&self, value: Option<String>, label: &str, flag: &str) -> Result<String> {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(value) => Ok(value.trim().to_string()),
            None => self.input(label, flag),
        }
    }

    pub fn input(&self, label: &str, flag: &str) -> Result<String> {
        self.require_tty(flag)?;
        let value: String = Input::new()
            .with_prompt(label)
            .validate_with(|input: &String| -> Result<(), String> {
                if input.trim().is_empty() {
                    Err(format!("{} cannot be empty", label))
                } else {
                    Ok(())
                }
            })
            .interact_text()
            .with_context(|| format!("Failed to read {}", label.to_lowercase()))?;
        Ok(value.trim().to_string())
    }

    pub fn secret_or_prompt(
        &self,
        value: Option<String>,
        label: &str,
        flag: &str,
    ) -> Result<String> {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            return Ok(value);
        }
        self.require_tty(flag)?;
        Password::new()
            .with_prompt(label)
            .interact()
            .with_context(|| format!("Failed to read {}", label.to_lowercase()))
    }

    pub fn select(&self, label: &str, items: &[&str], default: usize, flag: &str) -> Result<usize> {
        self.require_tty(flag)?;
        Select::new()
            .with_prompt(label)
            .items(items)
            .default(default)
            .interact()
            .with_context(|| format!("Failed to read {}", label.to_lowercase()))
    }

    /// Ask before destructive actions; `force` skips the question
    pub fn confirm(&self, question: &str, force: bool) -> Result<bool> {
        if force {
            return Ok(true);
        }
        if !self.should_prompt() {
            bail!("Refusing to continue without confirmation. Re-run with --force");
        }
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }

    fn require_tty(&self, flag: &str) -> Result<()> {
        if self.should_prompt() {
            Ok(())
        } else {
            bail!("Missing {} (interactive prompts are not available here)", flag)
        }
    }
}

impl Default for Prompter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if running in CI environment
pub fn is_in_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("JENKINS_URL").is_ok()
        || std::env::var("BUILDKITE").is_ok()
}
