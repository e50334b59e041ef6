// ABOUTME: Ticket operations: listing, lookup, comments, search, and writes
// ABOUTME: Commenting invalidates both the cached ticket and its cached comment list

use crate::cache::CacheKey;
use crate::client::{decode, ZendeskClient};
use crate::models::{
    Comment, CommentBody, CreateTicket, Page, PageEnvelope, Pagination, SingleEnvelope, Ticket,
    UpdateTicket,
};
use crate::Result;
use reqwest::Method;
use serde::Serialize;
use serde_json::json;

/// Request body for ticket creation; the description travels as the first comment
#[derive(Debug, Serialize)]
struct NewTicketBody<'a> {
    subject: &'a str,
    comment: NewComment<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<&'a str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    ticket_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    requester_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<i64>,
    #[serde(skip_serializing_if = "no_tags")]
    tags: &'a [String],
}

fn no_tags(tags: &&[String]) -> bool {
    tags.is_empty()
}

#[derive(Debug, Serialize)]
struct NewComment<'a> {
    body: &'a str,
}

impl<'a> From<&'a CreateTicket> for NewTicketBody<'a> {
    fn from(ticket: &'a CreateTicket) -> Self {
        Self {
            subject: &ticket.subject,
            comment: NewComment {
                body: &ticket.description,
            },
            priority: ticket.priority.as_deref(),
            ticket_type: ticket.ticket_type.as_deref(),
            status: ticket.status.as_deref(),
            requester_id: ticket.requester_id,
            assignee_id: ticket.assignee_id,
            group_id: ticket.group_id,
            tags: &ticket.tags,
        }
    }
}

impl ZendeskClient {
    /// List tickets, optionally narrowed to one status
    pub async fn list_tickets(
        &self,
        page: u32,
        per_page: u32,
        status: Option<&str>,
    ) -> Result<Page<Ticket>> {
        let paging = Pagination::new(page, per_page);
        let status = status.filter(|s| !s.is_empty());
        let key = CacheKey::TicketList {
            subdomain: self.subdomain().to_string(),
            page: paging.page,
            per_page: paging.per_page,
            status: status.map(str::to_string),
        };

        let mut query = paging.query().to_vec();
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }

        let envelope: PageEnvelope<Ticket> = self
            .get_cached(key, "tickets.json", &query, "list tickets")
            .await?;
        Ok(envelope.into())
    }

    pub async fn get_ticket(&self, id: i64) -> Result<Ticket> {
        let envelope: SingleEnvelope<Ticket> = self
            .get_cached(
                self.ticket_key(id),
                &format!("tickets/{id}.json"),
                &[],
                "get ticket",
            )
            .await?;
        Ok(envelope.item)
    }

    pub async fn get_ticket_comments(&self, id: i64) -> Result<Page<Comment>> {
        let envelope: PageEnvelope<Comment> = self
            .get_cached(
                self.comments_key(id),
                &format!("tickets/{id}/comments.json"),
                &[],
                "get ticket comments",
            )
            .await?;
        Ok(envelope.into())
    }

    /// Full-text ticket search; the query is qualified with `type:ticket`
    pub async fn search_tickets(&self, query: &str) -> Result<Page<Ticket>> {
        let key = CacheKey::TicketSearch {
            subdomain: self.subdomain().to_string(),
            query: query.to_string(),
        };
        let envelope: PageEnvelope<Ticket> = self
            .get_cached(
                key,
                "search.json",
                &[("query", format!("type:ticket {query}"))],
                "search tickets",
            )
            .await?;
        Ok(envelope.into())
    }

    pub async fn create_ticket(&self, ticket: &CreateTicket) -> Result<Ticket> {
        let body = self
            .write(
                Method::POST,
                "tickets.json",
                Some(json!({ "ticket": NewTicketBody::from(ticket) })),
                &[],
                "create ticket",
            )
            .await?;
        Ok(decode::<SingleEnvelope<Ticket>>(&body, "create ticket")?.item)
    }

    pub async fn update_ticket(&self, id: i64, update: &UpdateTicket) -> Result<Ticket> {
        let mut invalidate = vec![self.ticket_key(id)];
        if update.comment.is_some() {
            invalidate.push(self.comments_key(id));
        }
        let body = self
            .write(
                Method::PUT,
                &format!("tickets/{id}.json"),
                Some(json!({ "ticket": update })),
                &invalidate,
                "update ticket",
            )
            .await?;
        Ok(decode::<SingleEnvelope<Ticket>>(&body, "update ticket")?.item)
    }

    pub async fn add_ticket_comment(&self, id: i64, body: &str, public: bool) -> Result<Ticket> {
        let comment = CommentBody {
            body: body.to_string(),
            public,
        };
        let response = self
            .write(
                Method::PUT,
                &format!("tickets/{id}.json"),
                Some(json!({ "ticket": { "comment": comment } })),
                &[self.ticket_key(id), self.comments_key(id)],
                "add comment",
            )
            .await?;
        Ok(decode::<SingleEnvelope<Ticket>>(&response, "add comment")?.item)
    }

    fn ticket_key(&self, id: i64) -> CacheKey {
        CacheKey::Ticket {
            subdomain: self.subdomain().to_string(),
            id,
        }
    }

    fn comments_key(&self, id: i64) -> CacheKey {
        CacheKey::TicketComments {
            subdomain: self.subdomain().to_string(),
            id,
        }
    }
}
