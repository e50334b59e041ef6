// ABOUTME: `zd user` subcommands: list, show, me, search, create, update, suspend, unsuspend, delete
// ABOUTME: Reads honor --refresh; writes go straight to the API and invalidate cached records

use super::App;
use crate::cli::{UserCommand, LIST_PER_PAGE};
use anyhow::{bail, Context, Result};
use zendesk_sdk::{normalize_optional_id, CreateUser, UpdateUser};

impl App {
    pub(super) async fn user_command(&mut self, command: UserCommand) -> Result<()> {
        match command {
            UserCommand::List { list } => {
                let client = self.client(!list.read.refresh).await?;
                let page = client
                    .list_users(list.page, list.page_size(LIST_PER_PAGE))
                    .await
                    .context("Failed to list users")?;
                self.print_page(list.read.output.format, &page, "users", Some(&list))
            }
            UserCommand::Show { id, read } => {
                let client = self.client(!read.refresh).await?;
                let user = client
                    .get_user(id)
                    .await
                    .with_context(|| format!("Failed to get user {}", id))?;
                self.print_item(read.output.format, &user)
            }
            UserCommand::Me { read } => {
                let client = self.client(!read.refresh).await?;
                let user = client.get_me().await.context("Failed to get current user")?;
                self.print_item(read.output.format, &user)
            }
            UserCommand::Search { query, read } => {
                let client = self.client(!read.refresh).await?;
                let page = client
                    .search_users(&query)
                    .await
                    .context("Failed to search users")?;
                self.print_page(read.output.format, &page, "users", None)
            }
            UserCommand::Create {
                name,
                email,
                role,
                phone,
                organization,
                output,
            } => {
                let name = self.prompter.text_or_prompt(name, "Name", "--name")?;
                let email = self.prompter.text_or_prompt(email, "Email", "--email")?;
                let request = CreateUser {
                    name,
                    email,
                    role: Some(role).filter(|r| !r.is_empty()),
                    phone: phone.filter(|p| !p.is_empty()),
                    organization_id: normalize_optional_id(organization),
                };

                let client = self.client(false).await?;
                let user = client
                    .create_user(&request)
                    .await
                    .context("Failed to create user")?;
                self.ui.success(&format!("Created user {} ({})", user.id, user.name));
                self.print_item(output.format, &user)
            }
            UserCommand::Update {
                id,
                name,
                email,
                phone,
                role,
                verified,
                organization,
                output,
            } => {
                let request = UpdateUser {
                    name,
                    email,
                    phone,
                    role,
                    verified: verified.then_some(true),
                    organization_id: normalize_optional_id(organization),
                };
                if request.is_empty() {
                    bail!(
                        "Nothing to update. Pass at least one of --name, --email, --phone, \
                         --role, --verified, --organization"
                    );
                }

                let client = self.client(false).await?;
                let user = client
                    .update_user(id, &request)
                    .await
                    .with_context(|| format!("Failed to update user {}", id))?;
                self.ui.success(&format!("Updated user {}", user.id));
                self.print_item(output.format, &user)
            }
            UserCommand::Suspend { id, output } => {
                let client = self.client(false).await?;
                let user = client
                    .suspend_user(id)
                    .await
                    .with_context(|| format!("Failed to suspend user {}", id))?;
                self.ui.success(&format!("Suspended user {} ({})", user.id, user.name));
                self.print_item(output.format, &user)
            }
            UserCommand::Unsuspend { id, output } => {
                let client = self.client(false).await?;
                let user = client
                    .unsuspend_user(id)
                    .await
                    .with_context(|| format!("Failed to unsuspend user {}", id))?;
                self.ui
                    .success(&format!("Unsuspended user {} ({})", user.id, user.name));
                self.print_item(output.format, &user)
            }
            UserCommand::Delete { id, force } => {
                if !self
                    .prompter
                    .confirm(&format!("Delete user {}? This cannot be undone", id), force)?
                {
                    self.ui.info("Cancelled");
                    return Ok(());
                }

                let client = self.client(false).await?;
                client
                    .delete_user(id)
                    .await
                    .with_context(|| format!("Failed to delete user {}", id))?;
                self.ui.success(&format!("Deleted user {}", id));
                Ok(())
            }
        }
    }
}
