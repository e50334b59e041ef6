// ABOUTME: `zd ticket` subcommands covering reads, search, create/update, comments, assignment and closing
// ABOUTME: Zero IDs passed on the command line are treated as unset

use super::App;
use crate::cli::{TicketCommand, TICKET_PER_PAGE};
use anyhow::{bail, Context, Result};
use zendesk_sdk::{normalize_optional_id, CommentBody, CreateTicket, UpdateTicket};

const CLOSED_STATUS: &str = "closed";

impl App {
    pub(super) async fn ticket_command(&mut self, command: TicketCommand) -> Result<()> {
        match command {
            TicketCommand::List { status, list } => {
                let client = self.client(!list.read.refresh).await?;
                let page = client
                    .list_tickets(list.page, list.page_size(TICKET_PER_PAGE), status.as_deref())
                    .await
                    .context("Failed to list tickets")?;
                self.print_page(list.read.output.format, &page, "tickets", Some(&list))
            }
            TicketCommand::Show { id, read } => {
                let client = self.client(!read.refresh).await?;
                let ticket = client
                    .get_ticket(id)
                    .await
                    .with_context(|| format!("Failed to get ticket {}", id))?;
                self.print_item(read.output.format, &ticket)
            }
            TicketCommand::Comments { id, read } => {
                let client = self.client(!read.refresh).await?;
                let comments = client
                    .get_ticket_comments(id)
                    .await
                    .with_context(|| format!("Failed to get comments for ticket {}", id))?;
                self.print_page(read.output.format, &comments, "comments", None)
            }
            TicketCommand::Search { query, read } => {
                let client = self.client(!read.refresh).await?;
                let page = client
                    .search_tickets(&query)
                    .await
                    .context("Failed to search tickets")?;
                self.print_page(read.output.format, &page, "tickets", None)
            }
            TicketCommand::Create {
                subject,
                description,
                priority,
                ticket_type,
                status,
                requester,
                assignee,
                group,
                tags,
                output,
            } => {
                let subject = self.prompter.text_or_prompt(subject, "Subject", "--subject")?;
                let description =
                    self.prompter
                        .text_or_prompt(description, "Description", "--description")?;
                let request = CreateTicket {
                    subject,
                    description,
                    priority: priority.filter(|p| !p.is_empty()),
                    ticket_type: Some(ticket_type).filter(|t| !t.is_empty()),
                    status: Some(status).filter(|s| !s.is_empty()),
                    requester_id: normalize_optional_id(requester),
                    assignee_id: normalize_optional_id(assignee),
                    group_id: normalize_optional_id(group),
                    tags: clean_tags(tags),
                };

                let client = self.client(false).await?;
                let ticket = client
                    .create_ticket(&request)
                    .await
                    .context("Failed to create ticket")?;
                self.ui.success(&format!("Ticket #{} created", ticket.id));
                self.print_item(output.format, &ticket)
            }
            TicketCommand::Update {
                id,
                subject,
                priority,
                status,
                ticket_type,
                assignee,
                group,
                tags,
                output,
            } => {
                let request = UpdateTicket {
                    subject,
                    status,
                    priority,
                    ticket_type,
                    assignee_id: normalize_optional_id(assignee),
                    group_id: normalize_optional_id(group),
                    tags: tags.map(clean_tags),
                    comment: None,
                };
                if request.is_empty() {
                    bail!(
                        "Nothing to update. Pass at least one field such as --status or --priority"
                    );
                }

                let client = self.client(false).await?;
                let ticket = client
                    .update_ticket(id, &request)
                    .await
                    .with_context(|| format!("Failed to update ticket {}", id))?;
                self.ui.success(&format!("Ticket #{} updated", ticket.id));
                self.print_item(output.format, &ticket)
            }
            TicketCommand::Comment {
                id,
                message,
                private,
                output,
            } => {
                let message = self.prompter.text_or_prompt(message, "Comment", "--message")?;
                let client = self.client(false).await?;
                let ticket = client
                    .add_ticket_comment(id, &message, !private)
                    .await
                    .with_context(|| format!("Failed to add comment to ticket {}", id))?;
                let visibility = if private { "private" } else { "public" };
                self.ui.success(&format!(
                    "Added {} comment to ticket #{}",
                    visibility, ticket.id
                ));
                self.print_item(output.format, &ticket)
            }
            TicketCommand::Assign {
                id,
                user_id,
                output,
            } => {
                let Some(assignee_id) = normalize_optional_id(Some(user_id)) else {
                    bail!("Invalid user ID: {}", user_id);
                };
                let request = UpdateTicket {
                    assignee_id: Some(assignee_id),
                    ..Default::default()
                };

                let client = self.client(false).await?;
                let ticket = client
                    .update_ticket(id, &request)
                    .await
                    .with_context(|| format!("Failed to assign ticket {}", id))?;
                self.ui.success(&format!(
                    "Ticket #{} assigned to user {}",
                    ticket.id, assignee_id
                ));
                self.print_item(output.format, &ticket)
            }
            TicketCommand::Close {
                id,
                comment,
                output,
            } => {
                let request = UpdateTicket {
                    status: Some(CLOSED_STATUS.to_string()),
                    comment: comment
                        .filter(|c| !c.trim().is_empty())
                        .map(|body| CommentBody { body, public: true }),
                    ..Default::default()
                };

                let client = self.client(false).await?;
                let ticket = client
                    .update_ticket(id, &request)
                    .await
                    .with_context(|| format!("Failed to close ticket {}", id))?;
                self.ui.success(&format!("Ticket #{} closed", ticket.id));
                self.print_item(output.format, &ticket)
            }
        }
    }
}

/// Trim tags and drop empty entries left by stray commas
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_tags() {
        let tags = vec![" vip ".to_string(), String::new(), "billing".to_string()];
        assert_eq!(clean_tags(tags), vec!["vip", "billing"]);
    }
}
