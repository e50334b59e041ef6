// ABOUTME: Command execution for zd: loads config, builds the API client, dispatches subcommands
// ABOUTME: All output flows through App so commands can be exercised against mock servers

mod cache;
mod connection;
mod groups;
mod instance;
mod organizations;
mod tickets;
mod users;

use crate::cli::{Commands, ListArgs};
use crate::cli_output::CliOutput;
use crate::completions::{generate_completions, installation_instructions};
use crate::config::{CliConfig, InstanceConfig};
use crate::interactive::Prompter;
use crate::output::{render_item, render_list, Format, Record};
use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::CommandFactory;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use secrecy::SecretString;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use zendesk_sdk::oauth::refresh_token;
use zendesk_sdk::{AuthMode, Instance, OAuthSettings, Page, RetryConfig, ZendeskClient};

/// Refresh OAuth tokens this long before they actually expire
const REFRESH_MARGIN_SECS: i64 = 60;

pub struct App {
    config_path: PathBuf,
    instance: Option<String>,
    retry: bool,
    use_color: bool,
    ui: CliOutput,
    prompter: Prompter,
    cancel: CancellationToken,
    api_base_url: Option<String>,
    oauth_endpoint: Option<String>,
    cache_dir: Option<PathBuf>,
    out: Box<dyn Write>,
}

impl App {
    pub fn new(config_path: PathBuf, cancel: CancellationToken) -> Self {
        Self {
            config_path,
            instance: None,
            retry: false,
            use_color: false,
            ui: CliOutput::with_color(false),
            prompter: Prompter::disabled(),
            cancel,
            api_base_url: None,
            oauth_endpoint: None,
            cache_dir: None,
            out: Box::new(std::io::stdout()),
        }
    }

    /// Wire up global flags for an interactive terminal session
    pub fn from_flags(
        config: Option<PathBuf>,
        instance: Option<String>,
        no_color: bool,
        retry: bool,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let config_path = CliConfig::resolve_path(config.as_deref())?;
        let mut app = Self::new(config_path, cancel)
            .with_instance(instance)
            .with_retry(retry)
            .with_prompter(Prompter::new());
        app.use_color = crate::cli_output::color_enabled(no_color, std::io::stdout().is_terminal());
        app.ui = CliOutput::from_flags(no_color);
        Ok(app)
    }

    pub fn with_instance(mut self, instance: Option<String>) -> Self {
        self.instance = instance;
        self
    }

    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_prompter(mut self, prompter: Prompter) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    /// Send API calls to `base_url` instead of `https://{subdomain}.zendesk.com/api/v2`
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = Some(base_url.into());
        self
    }

    /// Send OAuth authorize and token calls to `origin` instead of the account domain
    pub fn with_oauth_endpoint(mut self, origin: impl Into<String>) -> Self {
        self.oauth_endpoint = Some(origin.into());
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { name, setup } => self.init(name, setup).await,
            Commands::Instance { command } => self.instance_command(command).await,
            Commands::Test { refresh } => self.test_connection(refresh).await,
            Commands::Reauth { name, port } => self.reauth(name, port).await,
            Commands::Cache { command } => self.cache_command(command),
            Commands::User { command } => self.user_command(command).await,
            Commands::Ticket { command } => self.ticket_command(command).await,
            Commands::Org { command } => self.org_command(command).await,
            Commands::Group { command } => self.group_command(command).await,
            Commands::Completions { shell } => {
                let mut cmd = crate::cli::Cli::command();
                generate_completions(shell, &mut cmd, &mut self.out);
                self.ui.info(&format!("Install with: {}", installation_instructions(shell)));
                Ok(())
            }
        }
    }

    fn load_config(&self) -> Result<CliConfig> {
        CliConfig::load_from_file(&self.config_path)
    }

    fn save_config(&self, config: &CliConfig) -> Result<()> {
        config
            .save_to_file(&self.config_path)
            .context("Failed to save configuration")
    }

    /// Build a client for the active instance, refreshing stale OAuth tokens first
    async fn client(&self, use_cache: bool) -> Result<ZendeskClient> {
        let mut config = self.load_config()?;
        let (name, instance) = config.active_instance(self.instance.as_deref())?;
        let name = name.to_string();
        let mut instance = instance.to_instance(&name);

        if matches!(instance.auth, AuthMode::OAuth { .. }) {
            self.refresh_oauth(&mut config, &mut instance).await?;
        }

        let retry = (self.retry || config.retry_requests).then(RetryConfig::default);
        debug!(
            "Using instance '{}' ({}.zendesk.com, {} auth), cache {}",
            name,
            instance.subdomain,
            instance.auth.kind(),
            if use_cache { "on" } else { "bypassed" }
        );

        ZendeskClient::builder()
            .instance(&instance)
            .use_cache(use_cache)
            .cache_ttl(config.cache_ttl())
            .retry_opt(retry)
            .base_url_opt(self.api_base_url.clone())
            .cache_dir_opt(self.cache_dir.clone())
            .cancel(self.cancel.clone())
            .build()
            .with_context(|| format!("Failed to create client for instance '{}'", name))
    }

    /// Swap expiring tokens for fresh ones and persist them before the client sees them
    async fn refresh_oauth(&self, config: &mut CliConfig, instance: &mut Instance) -> Result<()> {
        let deadline = Utc::now() + ChronoDuration::seconds(REFRESH_MARGIN_SECS);
        if !instance.token_expired(deadline) {
            return Ok(());
        }

        let name = instance.name.clone();
        let stored = &config.instances[&name];
        let secret = stored.oauth_secret.clone().unwrap_or_default();
        let settings = self.oauth_settings(stored, secret);
        let tokens = refresh_token(&settings, &stored.tokens())
            .await
            .with_context(|| format!("Failed to refresh OAuth token for '{}'", name))?;

        instance.apply_tokens(&tokens);
        config.update_tokens(&name, &tokens)?;
        self.save_config(config)?;
        info!("Refreshed OAuth token for instance '{}'", name);
        Ok(())
    }

    fn oauth_settings(&self, instance: &InstanceConfig, client_secret: String) -> OAuthSettings {
        let mut settings = OAuthSettings::new(
            instance.subdomain.clone(),
            instance.oauth_client_id.clone().unwrap_or_default(),
            SecretString::from(client_secret),
        );
        settings.endpoint_base = self.oauth_endpoint.clone();
        settings
    }

    fn emit(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text.trim_end_matches('\n')).context("Failed to write output")
    }

    fn print_item<T: Record>(&mut self, format: Format, item: &T) -> Result<()> {
        let rendered = render_item(format, self.use_color, item)?;
        self.emit(&rendered)
    }

    /// Print one page; `paging` enables the next-page hint for paginated listings
    fn print_page<T: Record>(
        &mut self,
        format: Format,
        page: &Page<T>,
        noun: &str,
        paging: Option<&ListArgs>,
    ) -> Result<()> {
        if page.items.is_empty() && format == Format::Table {
            return self.emit(&format!("No {} found.", noun));
        }

        let rendered = render_list(format, self.use_color, &page.items)?;
        self.emit(&rendered)?;

        if let (Format::Table, Some(paging), true) = (format, paging, page.has_more()) {
            self.ui.info(&format!(
                "More results available. Use --page {} to see the next page",
                paging.page + 1
            ));
        }
        Ok(())
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if !self.prompter.should_prompt() {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}
