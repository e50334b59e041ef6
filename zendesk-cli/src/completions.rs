// ABOUTME: Shell completion generation using clap_complete for all supported shells
// ABOUTME: Provides static completions for bash, zsh, fish, and powershell

use anyhow::{anyhow, Result};
use clap::{Command, ValueEnum};
use clap_complete::{generate, shells};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

const BIN_NAME: &str = "zd";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[allow(clippy::enum_variant_names)]
    PowerShell,
}

impl Shell {
    pub fn all() -> Vec<Shell> {
        vec![Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell]
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shell_str = match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
            Shell::PowerShell => "powershell",
        };
        write!(f, "{}", shell_str)
    }
}

impl FromStr for Shell {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bash" => Ok(Shell::Bash),
            "zsh" => Ok(Shell::Zsh),
            "fish" => Ok(Shell::Fish),
            "powershell" | "pwsh" => Ok(Shell::PowerShell),
            _ => Err(anyhow!(
                "Unsupported shell: {}. Supported shells: bash, zsh, fish, powershell",
                s
            )),
        }
    }
}

/// Write the completion script for `shell` to `writer`
pub fn generate_completions<W: Write>(shell: Shell, cmd: &mut Command, writer: &mut W) {
    match shell {
        Shell::Bash => generate(shells::Bash, cmd, BIN_NAME, writer),
        Shell::Zsh => generate(shells::Zsh, cmd, BIN_NAME, writer),
        Shell::Fish => generate(shells::Fish, cmd, BIN_NAME, writer),
        Shell::PowerShell => generate(shells::PowerShell, cmd, BIN_NAME, writer),
    }
}

/// One-line hint for installing the generated script
pub fn installation_instructions(shell: Shell) -> String {
    let hint = match shell {
        Shell::Bash => "zd completions bash > ~/.local/share/bash-completion/completions/zd",
        Shell::Zsh => "zd completions zsh > ~/.zfunc/_zd   # then add ~/.zfunc to $fpath",
        Shell::Fish => "zd completions fish > ~/.config/fish/completions/zd.fish",
        Shell::PowerShell => {
            "zd completions powershell > zd.ps1   # then source it from your profile"
        }
    };
    hint.to_string()
}
