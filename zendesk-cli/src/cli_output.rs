// ABOUTME: Centralized CLI output utilities for consistent user-facing messages
// ABOUTME: Provides standardized formatting for errors, warnings, info and success messages

use owo_colors::OwoColorize;
use std::io::IsTerminal;
use zendesk_sdk::ZendeskError;

/// Decide whether a stream should get ANSI colors
pub fn color_enabled(no_color_flag: bool, is_terminal: bool) -> bool {
    !no_color_flag
        && std::env::var_os("NO_COLOR").is_none()
        && std::env::var("TERM").unwrap_or_default() != "dumb"
        && is_terminal
}

/// Centralized CLI output utilities for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct CliOutput {
    use_color: bool,
}

impl CliOutput {
    /// Create new CLI output utility with TTY detection
    pub fn new() -> Self {
        Self {
            use_color: color_enabled(false, std::io::stderr().is_terminal()),
        }
    }

    /// Honor `--no-color` on top of TTY and environment detection
    pub fn from_flags(no_color: bool) -> Self {
        Self {
            use_color: color_enabled(no_color, std::io::stderr().is_terminal()),
        }
    }

    /// Create CLI output utility with explicit color setting
    pub fn with_color(use_color: bool) -> Self {
        Self { use_color }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", self.error_line(message));
    }

    pub fn warning(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "warning:".yellow().bold(), message);
        } else {
            eprintln!("warning: {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "info:".blue().bold(), message);
        } else {
            eprintln!("info: {}", message);
        }
    }

    pub fn success(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "✓".green().bold(), message);
        } else {
            eprintln!("✓ {}", message);
        }
    }

    /// Display a progress/status message with an icon
    pub fn status(&self, icon: &str, message: &str) {
        if self.use_color {
            eprintln!("{} {}", icon.dimmed(), message);
        } else {
            eprintln!("{} {}", icon, message);
        }
    }

    /// Print a failed command: the classified message, API detail, then a suggestion
    pub fn report_error(&self, err: &anyhow::Error) {
        for line in self.error_report(err) {
            eprintln!("{}", line);
        }
    }

    fn error_line(&self, message: &str) -> String {
        if self.use_color {
            format!("{} {}", "error:".red().bold(), message)
        } else {
            format!("error: {}", message)
        }
    }

    /// Lines printed by `report_error`
    pub fn error_report(&self, err: &anyhow::Error) -> Vec<String> {
        let mut lines = vec![self.error_line(&format!("{:#}", err))];

        let Some(zendesk) = err.chain().find_map(|e| e.downcast_ref::<ZendeskError>()) else {
            return lines;
        };

        if let Some(details) = zendesk.api_error().and_then(|api| api.details.as_ref()) {
            lines.push(format!("  details: {}", details));
        }
        if let Some(help) = zendesk.help_text() {
            let suggestion = format!("Suggestion: {}", help);
            lines.push(if self.use_color {
                suggestion.dimmed().to_string()
            } else {
                suggestion
            });
        }
        lines
    }
}

impl Default for CliOutput {
    fn default() -> Self {
        Self::new()
    }
}
