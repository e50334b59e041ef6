// ABOUTME: Zendesk SDK library providing a typed REST client for the Zendesk Support API
// ABOUTME: Includes credentials, response caching, retry, error classification and OAuth

pub mod builder;
pub mod cache;
pub mod client;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod groups;
pub mod models;
#[cfg(feature = "oauth")]
pub mod oauth;
pub mod organizations;
pub mod retry;
pub mod test_helpers;
pub mod tickets;
pub mod users;

pub use builder::ZendeskClientConfig;
pub use cache::{Cache, CacheError, CacheKey, CacheStats, PruneReport};
pub use client::ZendeskClient;
pub use credentials::{normalize_optional_id, AuthMode, Instance, OAuthTokens};
pub use error::{status_message, ApiError, OAuthError, ZendeskError};
pub use models::{
    Comment, CommentBody, CreateTicket, CreateUser, Group, GroupMembership, Organization, Page,
    Pagination, Ticket, UpdateTicket, UpdateUser, User,
};
pub use retry::{retry_with_backoff, RetryConfig};

#[cfg(feature = "oauth")]
pub use oauth::{FlowState, OAuthFlow, OAuthSettings};

pub type Result<T> = std::result::Result<T, ZendeskError>;
