// ABOUTME: `zd group` subcommands: list, show, users and memberships
// ABOUTME: Read-only group browsing with pagination hints for table output

use super::App;
use crate::cli::{GroupCommand, LIST_PER_PAGE};
use anyhow::{Context, Result};

impl App {
    pub(super) async fn group_command(&mut self, command: GroupCommand) -> Result<()> {
        match command {
            GroupCommand::List { list } => {
                let client = self.client(!list.read.refresh).await?;
                let page = client
                    .list_groups(list.page, list.page_size(LIST_PER_PAGE))
                    .await
                    .context("Failed to list groups")?;
                self.print_page(list.read.output.format, &page, "groups", Some(&list))
            }
            GroupCommand::Show { id, read } => {
                let client = self.client(!read.refresh).await?;
                let group = client
                    .get_group(id)
                    .await
                    .with_context(|| format!("Failed to get group {}", id))?;
                self.print_item(read.output.format, &group)
            }
            GroupCommand::Users { id, list } => {
                let client = self.client(!list.read.refresh).await?;
                let page = client
                    .get_group_users(id, list.page, list.page_size(LIST_PER_PAGE))
                    .await
                    .with_context(|| format!("Failed to list users of group {}", id))?;
                self.print_page(list.read.output.format, &page, "users", Some(&list))
            }
            GroupCommand::Memberships { id, list } => {
                let client = self.client(!list.read.refresh).await?;
                let page = client
                    .get_group_memberships(id, list.page, list.page_size(LIST_PER_PAGE))
                    .await
                    .with_context(|| format!("Failed to list memberships of group {}", id))?;
                self.print_page(list.read.output.format, &page, "memberships", Some(&list))
            }
        }
    }
}
