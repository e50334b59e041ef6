// ABOUTME: Credential store for named Zendesk instances persisted as TOML under ~/.zd
// ABOUTME: Handles instance management, cache TTL parsing, and secure file permissions

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use zendesk_sdk::constants::cache as cache_defaults;
use zendesk_sdk::{AuthMode, Instance, OAuthTokens};

/// Environment variable that points at an alternative config file
pub const CONFIG_ENV: &str = "ZD_CONFIG";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No configuration found at {}. Run 'zd init' to get started", .0.display())]
    NotFound(PathBuf),
    #[error("No current instance set. Run 'zd instance switch <name>' to select an instance")]
    NoCurrentInstance,
    #[error("Instance '{0}' not found")]
    InstanceNotFound(String),
    #[error("Instance '{0}' already exists")]
    InstanceExists(String),
    #[error("Invalid instance name '{0}'. Use letters, digits, '-' or '_'")]
    InvalidInstanceName(String),
    #[error("Could not determine home directory")]
    NoHomeDir,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    Token,
    #[value(name = "oauth")]
    OAuth,
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthType::Token => write!(f, "token"),
            AuthType::OAuth => write!(f, "oauth"),
        }
    }
}

/// One `[instances.<name>]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub subdomain: String,
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_refresh: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_expiry: Option<DateTime<Utc>>,
}

impl InstanceConfig {
    pub fn token(subdomain: &str, email: &str, api_token: &str) -> Self {
        Self {
            subdomain: subdomain.to_string(),
            auth_type: AuthType::Token,
            email: Some(email.to_string()),
            api_token: Some(api_token.to_string()),
            ..Default::default()
        }
    }

    pub fn oauth(
        subdomain: &str,
        client_id: &str,
        client_secret: &str,
        tokens: &OAuthTokens,
    ) -> Self {
        let mut config = Self {
            subdomain: subdomain.to_string(),
            auth_type: AuthType::OAuth,
            oauth_client_id: Some(client_id.to_string()),
            oauth_secret: Some(client_secret.to_string()),
            ..Default::default()
        };
        config.set_tokens(tokens);
        config
    }

    /// Store freshly issued tokens, keeping the old refresh token when none was returned
    pub fn set_tokens(&mut self, tokens: &OAuthTokens) {
        self.oauth_token = Some(tokens.access_token.expose_secret().to_string());
        if let Some(refresh) = &tokens.refresh_token {
            self.oauth_refresh = Some(refresh.expose_secret().to_string());
        }
        self.oauth_expiry = tokens.expires_at;
    }

    pub fn tokens(&self) -> OAuthTokens {
        OAuthTokens {
            access_token: secret(&self.oauth_token),
            refresh_token: self.oauth_refresh.as_ref().map(|r| SecretString::from(r.clone())),
            expires_at: self.oauth_expiry,
        }
    }

    /// Build the SDK credential record; the SDK validates required fields
    pub fn to_instance(&self, name: &str) -> Instance {
        let auth = match self.auth_type {
            AuthType::Token => AuthMode::Token {
                email: self.email.clone().unwrap_or_default(),
                api_token: secret(&self.api_token),
            },
            AuthType::OAuth => AuthMode::OAuth {
                client_id: self.oauth_client_id.clone().unwrap_or_default(),
                client_secret: secret(&self.oauth_secret),
                access_token: secret(&self.oauth_token),
                refresh_token: secret(&self.oauth_refresh),
                expiry: self.oauth_expiry,
            },
        };
        Instance {
            name: name.to_string(),
            subdomain: self.subdomain.clone(),
            auth,
        }
    }
}

fn secret(value: &Option<String>) -> SecretString {
    SecretString::from(value.clone().unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(default)]
    pub retry_requests: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "validate_duration"
    )]
    pub cache_ttl: Option<String>,
    #[serde(default)]
    pub instances: BTreeMap<String, InstanceConfig>,
}

impl CliConfig {
    /// `$ZD_CONFIG`, falling back to `~/.zd/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home
            .join(cache_defaults::STATE_DIR)
            .join(CONFIG_FILE))
    }

    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_path(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()).into());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load the file, or start empty when it does not exist yet
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load_from_file(path) {
            Err(e) if matches!(e.downcast_ref::<ConfigError>(), Some(ConfigError::NotFound(_))) => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Write atomically with owner-only permissions
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                    .with_context(|| format!("Failed to secure {}", parent.display()))?;
            }
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        let temp = path.with_extension("toml.tmp");
        fs::write(&temp, content)
            .with_context(|| format!("Failed to write config file: {}", temp.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to secure {}", temp.display()))?;
        }
        fs::rename(&temp, path)
            .with_context(|| format!("Failed to save config file: {}", path.display()))?;

        log::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for name in self.instances.keys() {
            validate_instance_name(name)?;
        }
        if let Some(current) = &self.current {
            if !self.instances.contains_key(current) {
                return Err(ConfigError::InstanceNotFound(current.clone()))
                    .context("Invalid 'current' setting");
            }
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(cache_defaults::DEFAULT_TTL)
    }

    /// Add an instance; the first instance always becomes current
    pub fn add_instance(
        &mut self,
        name: &str,
        instance: InstanceConfig,
        make_current: bool,
    ) -> Result<(), ConfigError> {
        validate_instance_name(name)?;
        if self.instances.contains_key(name) {
            return Err(ConfigError::InstanceExists(name.to_string()));
        }

        self.instances.insert(name.to_string(), instance);
        if self.current.is_none() || make_current {
            self.current = Some(name.to_string());
        }
        Ok(())
    }

    /// Remove an instance; a removed current instance hands over to the first remaining one
    pub fn remove_instance(&mut self, name: &str) -> Result<InstanceConfig, ConfigError> {
        let removed = self
            .instances
            .remove(name)
            .ok_or_else(|| ConfigError::InstanceNotFound(name.to_string()))?;

        if self.current.as_deref() == Some(name) {
            self.current = self.instances.keys().next().cloned();
        }
        Ok(removed)
    }

    pub fn switch_instance(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.instances.contains_key(name) {
            return Err(ConfigError::InstanceNotFound(name.to_string()));
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    /// The instance named by `--instance`, or the current one
    pub fn active_instance<'a>(
        &'a self,
        requested: Option<&'a str>,
    ) -> Result<(&'a str, &'a InstanceConfig), ConfigError> {
        let name = requested
            .or(self.current.as_deref())
            .ok_or(ConfigError::NoCurrentInstance)?;
        let instance = self
            .instances
            .get(name)
            .ok_or_else(|| ConfigError::InstanceNotFound(name.to_string()))?;
        Ok((name, instance))
    }

    pub fn update_tokens(&mut self, name: &str, tokens: &OAuthTokens) -> Result<(), ConfigError> {
        let instance = self
            .instances
            .get_mut(name)
            .ok_or_else(|| ConfigError::InstanceNotFound(name.to_string()))?;
        instance.set_tokens(tokens);
        Ok(())
    }
}

pub fn validate_instance_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidInstanceName(name.to_string()))
    }
}

/// Parse `30s`, `10m`, `1h` or `2d`
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let unit = value.chars().last()?;
    let amount: u64 = value[..value.len() - unit.len_utf8()].parse().ok()?;
    let seconds = match unit {
        's' => amount,
        'm' => amount.checked_mul(60)?,
        'h' => amount.checked_mul(3_600)?,
        'd' => amount.checked_mul(86_400)?,
        _ => return None,
    };
    Some(Duration::from_secs(seconds))
}

/// Inverse of `parse_duration`, using the largest unit that divides evenly
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    match seconds {
        0 => "0s".to_string(),
        s if s % 86_400 == 0 => format!("{}d", s / 86_400),
        s if s % 3_600 == 0 => format!("{}h", s / 3_600),
        s if s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{}s", s),
    }
}

fn validate_duration<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<String>::deserialize(deserializer)?;
    match value {
        Some(ref duration) if parse_duration(duration).is_none() => Err(D::Error::custom(format!(
            "Invalid duration format '{}'. Expected format like '30s', '10m', '1h', '2d'",
            duration
        ))),
        _ => Ok(value),
    }
}
