// ABOUTME: Test helper utilities for mocking Zendesk API responses and server
// ABOUTME: Provides mockito-based helpers and JSON fixtures for unit testing API interactions

#[cfg(test)]
use crate::{Instance, ZendeskClient};
#[cfg(test)]
use mockito::{Server, ServerGuard};
#[cfg(test)]
use serde_json::json;
#[cfg(test)]
use std::path::Path;

#[cfg(test)]
pub async fn mock_server() -> ServerGuard {
    Server::new_async().await
}

#[cfg(test)]
pub fn test_instance() -> Instance {
    Instance::with_token("work", "acme", "a@b.com", "tok123")
}

/// Client pointed at the mock server; caching only when a directory is given
#[cfg(test)]
pub fn test_client(server: &ServerGuard, cache_dir: Option<&Path>) -> ZendeskClient {
    let instance = test_instance();
    let builder = ZendeskClient::builder()
        .instance(&instance)
        .base_url(server.url());
    match cache_dir {
        Some(dir) => builder.use_cache(true).cache_dir(dir).build(),
        None => builder.use_cache(false).build(),
    }
    .expect("test client should build")
}

#[cfg(test)]
pub fn mock_user(id: i64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "url": format!("https://acme.zendesk.com/api/v2/users/{id}.json"),
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
        "role": "agent",
        "active": true,
        "suspended": false,
        "verified": true,
        "organization_id": null,
        "phone": null,
        "time_zone": "Pacific Time (US & Canada)",
        "locale": "en-US",
        "tags": [],
        "created_at": "2024-01-15T10:30:00Z",
        "updated_at": "2024-01-16T14:45:00Z",
        "last_login_at": "2024-02-01T08:00:00Z"
    })
}

#[cfg(test)]
pub fn mock_ticket(id: i64, subject: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "url": format!("https://acme.zendesk.com/api/v2/tickets/{id}.json"),
        "subject": subject,
        "description": "Customer reported the issue by email.",
        "status": status,
        "priority": "high",
        "type": "incident",
        "requester_id": 100,
        "submitter_id": 100,
        "assignee_id": 200,
        "organization_id": 300,
        "group_id": 400,
        "tags": ["printer", "urgent"],
        "due_at": null,
        "via": {"channel": "email"},
        "custom_fields": [],
        "created_at": "2024-01-15T10:30:00Z",
        "updated_at": "2024-01-16T14:45:00Z"
    })
}

#[cfg(test)]
pub fn mock_users_page(next_page: Option<&str>) -> serde_json::Value {
    json!({
        "users": [mock_user(1, "Ada"), mock_user(2, "Grace")],
        "next_page": next_page,
        "previous_page": null,
        "count": 4
    })
}

#[cfg(test)]
pub fn mock_tickets_page() -> serde_json::Value {
    json!({
        "tickets": [
            mock_ticket(1, "Printer on fire", "open"),
            mock_ticket(2, "Cannot log in", "pending")
        ],
        "next_page": null,
        "previous_page": null,
        "count": 2
    })
}

#[cfg(test)]
pub fn mock_comments_page() -> serde_json::Value {
    json!({
        "comments": [
            {
                "id": 11,
                "type": "Comment",
                "author_id": 100,
                "body": "It is still on fire.",
                "html_body": "<p>It is still on fire.</p>",
                "plain_body": "It is still on fire.",
                "public": true,
                "attachments": [],
                "created_at": "2024-01-15T10:30:00Z"
            },
            {
                "id": 12,
                "type": "Comment",
                "author_id": 200,
                "body": "Internal: extinguisher dispatched.",
                "plain_body": "Internal: extinguisher dispatched.",
                "public": false,
                "created_at": "2024-01-15T11:00:00Z"
            }
        ],
        "next_page": null,
        "count": 2
    })
}

#[cfg(test)]
pub fn mock_organization(id: i64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "url": format!("https://acme.zendesk.com/api/v2/organizations/{id}.json"),
        "name": name,
        "domain_names": ["example.com"],
        "details": "Enterprise customer",
        "notes": null,
        "group_id": null,
        "shared_tickets": true,
        "shared_comments": false,
        "tags": ["vip"],
        "organization_fields": {},
        "created_at": "2024-01-15T10:30:00Z",
        "updated_at": "2024-01-16T14:45:00Z"
    })
}

#[cfg(test)]
pub fn mock_group(id: i64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "url": format!("https://acme.zendesk.com/api/v2/groups/{id}.json"),
        "name": name,
        "description": "Front line support",
        "default": id == 1,
        "deleted": false,
        "created_at": "2024-01-15T10:30:00Z",
        "updated_at": "2024-01-16T14:45:00Z"
    })
}

#[cfg(test)]
pub fn mock_memberships_page() -> serde_json::Value {
    json!({
        "group_memberships": [
            {
                "id": 501,
                "user_id": 1,
                "group_id": 400,
                "default": true,
                "created_at": "2024-01-15T10:30:00Z",
                "updated_at": "2024-01-15T10:30:00Z"
            }
        ],
        "next_page": null,
        "count": 1
    })
}

#[cfg(test)]
pub fn mock_not_found_response() -> serde_json::Value {
    json!({
        "error": "RecordNotFound",
        "description": "Not found"
    })
}

#[cfg(test)]
pub fn mock_validation_error_response() -> serde_json::Value {
    json!({
        "error": "RecordInvalid",
        "description": "Record validation errors",
        "details": {
            "email": [{"description": "Email: is already being used by another user"}]
        }
    })
}
