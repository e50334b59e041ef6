// ABOUTME: Instance setup and management commands: init, instance add/list/switch/remove/current
// ABOUTME: Also hosts the browser-based OAuth authorization used by setup and reauth

use super::App;
use crate::cli::{InstanceCommand, InstanceSetup};
use crate::config::{validate_instance_name, AuthType, CliConfig, ConfigError, InstanceConfig};
use anyhow::{anyhow, bail, Context, Result};
use secrecy::SecretString;
use tabled::builder::Builder;
use tabled::settings::Style;
use zendesk_sdk::constants::urls;
use zendesk_sdk::oauth::open_browser;
use zendesk_sdk::{OAuthFlow, OAuthSettings, OAuthTokens, ZendeskError};

impl App {
    pub(super) async fn init(&mut self, name: Option<String>, setup: InstanceSetup) -> Result<()> {
        self.ui.info("Setting up a Zendesk instance for zd");
        self.add_instance(name, setup, true).await
    }

    pub(super) async fn instance_command(&mut self, command: InstanceCommand) -> Result<()> {
        match command {
            InstanceCommand::Add {
                name,
                setup,
                switch,
            } => self.add_instance(name, setup, switch).await,
            InstanceCommand::List => self.list_instances(),
            InstanceCommand::Switch { name } => {
                let mut config = self.load_config()?;
                config.switch_instance(&name)?;
                self.save_config(&config)?;
                self.ui.success(&format!("Switched to instance '{}'", name));
                Ok(())
            }
            InstanceCommand::Remove { name, force } => self.remove_instance(&name, force),
            InstanceCommand::Current => {
                let config = self.load_config()?;
                let (name, instance) = config.active_instance(self.instance.as_deref())?;
                let line = format!(
                    "{} ({}.{}, {} auth)",
                    name,
                    instance.subdomain,
                    urls::ZENDESK_HOST,
                    instance.auth_type
                );
                self.emit(&line)
            }
        }
    }

    async fn add_instance(
        &mut self,
        name: Option<String>,
        setup: InstanceSetup,
        make_current: bool,
    ) -> Result<()> {
        let mut config = CliConfig::load_or_default(&self.config_path)?;

        let name = self
            .prompter
            .text_or_prompt(name, "Instance name", "instance name")?;
        validate_instance_name(&name)?;
        if config.instances.contains_key(&name) {
            return Err(ConfigError::InstanceExists(name).into());
        }

        let subdomain = self.prompter.text_or_prompt(
            setup.subdomain,
            "Zendesk subdomain (e.g. 'acme' for acme.zendesk.com)",
            "--subdomain",
        )?;
        let subdomain = normalize_subdomain(&subdomain);
        if subdomain.is_empty() {
            bail!("subdomain cannot be empty");
        }

        let auth = match setup.auth {
            Some(auth) => auth,
            None if self.prompter.should_prompt() => {
                let choice = self.prompter.select(
                    "Authentication method",
                    &["API token", "OAuth"],
                    0,
                    "--auth",
                )?;
                if choice == 1 {
                    AuthType::OAuth
                } else {
                    AuthType::Token
                }
            }
            None => AuthType::Token,
        };

        let instance = match auth {
            AuthType::Token => {
                let email = self.prompter.text_or_prompt(setup.email, "Email", "--email")?;
                if !email.contains('@') {
                    bail!("invalid email format: {}", email);
                }
                let api_token =
                    self.prompter
                        .secret_or_prompt(setup.api_token, "API token", "--api-token")?;
                InstanceConfig::token(&subdomain, &email, &api_token)
            }
            AuthType::OAuth => {
                let client_id =
                    self.prompter
                        .text_or_prompt(setup.client_id, "OAuth client ID", "--client-id")?;
                let client_secret = self.prompter.secret_or_prompt(
                    setup.client_secret,
                    "OAuth client secret",
                    "--client-secret",
                )?;

                let mut settings = OAuthSettings::new(
                    subdomain.clone(),
                    client_id.clone(),
                    SecretString::from(client_secret.clone()),
                );
                settings.redirect_port = setup.port;
                settings.endpoint_base = self.oauth_endpoint.clone();

                let tokens = self.authorize(settings).await?;
                InstanceConfig::oauth(&subdomain, &client_id, &client_secret, &tokens)
            }
        };

        config.add_instance(&name, instance, make_current)?;
        self.save_config(&config)?;

        self.ui.success(&format!(
            "Instance '{}' added ({}.{})",
            name,
            subdomain,
            urls::ZENDESK_HOST
        ));
        if config.current.as_deref() == Some(name.as_str()) {
            self.ui.info(&format!("Now using instance '{}'", name));
        }
        Ok(())
    }

    fn list_instances(&mut self) -> Result<()> {
        let config = self.load_config()?;
        if config.instances.is_empty() {
            return self.emit("No instances configured. Run 'zd init' to get started.");
        }

        let mut builder = Builder::default();
        builder.push_record(["", "NAME", "SUBDOMAIN", "AUTH TYPE", "EMAIL"].map(String::from));
        for (name, instance) in &config.instances {
            let marker = if config.current.as_deref() == Some(name.as_str()) {
                "*"
            } else {
                ""
            };
            builder.push_record([
                marker.to_string(),
                name.clone(),
                instance.subdomain.clone(),
                instance.auth_type.to_string(),
                instance.email.clone().unwrap_or_else(|| "-".to_string()),
            ]);
        }

        let mut table = builder.build();
        table.with(Style::psql());
        self.emit(&table.to_string())
    }

    fn remove_instance(&mut self, name: &str, force: bool) -> Result<()> {
        let mut config = self.load_config()?;
        if !config.instances.contains_key(name) {
            return Err(ConfigError::InstanceNotFound(name.to_string()).into());
        }
        if !self
            .prompter
            .confirm(&format!("Remove instance '{}'?", name), force)?
        {
            self.ui.info("Cancelled");
            return Ok(());
        }

        config.remove_instance(name)?;
        self.save_config(&config)?;
        self.ui.success(&format!("Removed instance '{}'", name));

        match &config.current {
            Some(current) => self
                .ui
                .info(&format!("Current instance is '{}'", current)),
            None => self
                .ui
                .warning("No instances remain. Run 'zd init' to add one"),
        }
        Ok(())
    }

    pub(super) async fn reauth(&mut self, name: Option<String>, port: u16) -> Result<()> {
        let mut config = self.load_config()?;
        let name = match name.or_else(|| self.instance.clone()) {
            Some(name) => name,
            None => config.current.clone().ok_or_else(|| {
                anyhow!("no current instance set. Specify instance name: zd reauth <instance-name>")
            })?,
        };
        let instance = config
            .instances
            .get(&name)
            .ok_or_else(|| anyhow!("instance '{}' not found", name))?;
        if instance.auth_type != AuthType::OAuth {
            bail!(
                "instance '{}' uses {} authentication, not OAuth",
                name,
                instance.auth_type
            );
        }

        let mut settings =
            self.oauth_settings(instance, instance.oauth_secret.clone().unwrap_or_default());
        settings.redirect_port = port;
        self.ui.info(&format!(
            "Re-authorizing instance '{}' ({}.{})",
            name,
            instance.subdomain,
            urls::ZENDESK_HOST
        ));

        let tokens = self.authorize(settings).await?;
        config.update_tokens(&name, &tokens)?;
        self.save_config(&config)?;
        self.ui
            .success(&format!("Re-authorization successful. Tokens saved for '{}'", name));
        Ok(())
    }

    /// Run the browser flow, showing the authorization URL and a spinner while waiting
    async fn authorize(&self, settings: OAuthSettings) -> Result<OAuthTokens> {
        let mut flow = OAuthFlow::new(settings).map_err(ZendeskError::from)?;
        let ui = self.ui;
        let launch_browser = self.prompter.should_prompt();
        let spinner = self.spinner("Waiting for authorization in your browser...");

        let result = flow
            .run(&self.cancel, |url| {
                spinner.suspend(|| {
                    ui.info("Open this URL to authorize zd:");
                    eprintln!("  {}", url);
                    if launch_browser && !open_browser(url) {
                        ui.warning("Could not open a browser automatically");
                    }
                });
            })
            .await;
        spinner.finish_and_clear();

        result
            .map_err(ZendeskError::from)
            .context("OAuth authorization failed")
    }
}

/// Accept `acme`, `acme.zendesk.com` or a full URL and keep only the subdomain
pub(crate) fn normalize_subdomain(input: &str) -> String {
    let trimmed = input.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let host = without_scheme.split('/').next().unwrap_or_default();
    host.strip_suffix(&format!(".{}", urls::ZENDESK_HOST))
        .unwrap_or(host)
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_subdomain() {
        assert_eq!(normalize_subdomain("acme"), "acme");
        assert_eq!(normalize_subdomain(" Acme.zendesk.com "), "acme");
        assert_eq!(normalize_subdomain("https://acme.zendesk.com/agent"), "acme");
        assert_eq!(normalize_subdomain(""), "");
    }
}
