// ABOUTME: `zd org` subcommands: list, show, search, plus the users and tickets of an organization
// ABOUTME: Read-only; every command honors --refresh and the shared output formats

use super::App;
use crate::cli::{OrgCommand, LIST_PER_PAGE};
use anyhow::{Context, Result};

impl App {
    pub(super) async fn org_command(&mut self, command: OrgCommand) -> Result<()> {
        match command {
            OrgCommand::List { list } => {
                let client = self.client(!list.read.refresh).await?;
                let page = client
                    .list_organizations(list.page, list.page_size(LIST_PER_PAGE))
                    .await
                    .context("Failed to list organizations")?;
                self.print_page(list.read.output.format, &page, "organizations", Some(&list))
            }
            OrgCommand::Show { id, read } => {
                let client = self.client(!read.refresh).await?;
                let organization = client
                    .get_organization(id)
                    .await
                    .with_context(|| format!("Failed to get organization {}", id))?;
                self.print_item(read.output.format, &organization)
            }
            OrgCommand::Search { name, read } => {
                let client = self.client(!read.refresh).await?;
                let page = client
                    .search_organizations(&name)
                    .await
                    .context("Failed to search organizations")?;
                self.print_page(read.output.format, &page, "organizations", None)
            }
            OrgCommand::Users { id, list } => {
                let client = self.client(!list.read.refresh).await?;
                let page = client
                    .get_organization_users(id, list.page, list.page_size(LIST_PER_PAGE))
                    .await
                    .with_context(|| format!("Failed to list users of organization {}", id))?;
                self.print_page(list.read.output.format, &page, "users", Some(&list))
            }
            OrgCommand::Tickets { id, list } => {
                let client = self.client(!list.read.refresh).await?;
                let page = client
                    .get_organization_tickets(id, list.page, list.page_size(LIST_PER_PAGE))
                    .await
                    .with_context(|| format!("Failed to list tickets of organization {}", id))?;
                self.print_page(list.read.output.format, &page, "tickets", Some(&list))
            }
        }
    }
}
