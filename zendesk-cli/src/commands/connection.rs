// ABOUTME: `zd test` - verifies credentials against the active instance
// ABOUTME: Prints the authenticated user's name, email and role on success

use super::App;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use zendesk_sdk::constants::urls;

impl App {
    pub(super) async fn test_connection(&mut self, refresh: bool) -> Result<()> {
        let client = self.client(!refresh).await?;

        self.ui.status(
            "→",
            &format!(
                "Testing connection to '{}' ({}.{})...",
                self.active_name()?,
                client.subdomain(),
                urls::ZENDESK_HOST
            ),
        );
        if refresh {
            self.ui.status("→", "(bypassing cache)");
        }

        client
            .test_connection()
            .await
            .context("Connection test failed")?;

        let user = match client.get_me().await {
            Ok(user) => user,
            Err(e) => {
                self.ui.warning(&format!(
                    "Connection succeeded but failed to get user info: {}",
                    e
                ));
                return Ok(());
            }
        };

        self.ui.success("Connection successful!");
        let name = if self.use_color {
            user.name.bold().to_string()
        } else {
            user.name.clone()
        };
        self.emit(&format!("  Authenticated as: {}", name))?;
        let email = if user.email.is_empty() {
            "-"
        } else {
            user.email.as_str()
        };
        self.emit(&format!("  Email: {}", email))?;
        self.emit(&format!("  Role: {}", user.role))
    }

    fn active_name(&self) -> Result<String> {
        let config = self.load_config()?;
        let (name, _) = config.active_instance(self.instance.as_deref())?;
        Ok(name.to_string())
    }
}
