// ABOUTME: Custom error types for the Zendesk SDK with user-friendly messages
// ABOUTME: Classifies remote API failures by status and carries suggestions for the CLI

use crate::cache::CacheError;
use http::StatusCode;
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Error)]
pub enum ZendeskError {
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: Cow<'static, str>,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Timeout: Request took too long to complete")]
    Timeout,

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Invalid API response format while trying to {context}")]
    InvalidResponse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<ZendeskError>,
    },

    #[error("Failed to {operation}: {source}")]
    Context {
        operation: String,
        #[source]
        source: Box<ZendeskError>,
    },
}

impl ZendeskError {
    pub fn validation(field: &'static str, message: &'static str) -> Self {
        ZendeskError::Validation {
            field,
            message: Cow::Borrowed(message),
        }
    }

    /// Wrap this error with the operation that produced it
    pub fn context(self, operation: impl Into<String>) -> Self {
        ZendeskError::Context {
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping operation context and retry wrappers
    pub fn root(&self) -> &ZendeskError {
        match self {
            ZendeskError::Context { source, .. } => source.root(),
            ZendeskError::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    /// The classified API error, if the failure came from a non-2xx response
    pub fn api_error(&self) -> Option<&ApiError> {
        match self.root() {
            ZendeskError::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.api_error().map(|err| err.status)
    }

    pub fn is_rate_limit(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_rate_limit)
    }

    pub fn is_auth_error(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_auth_error)
    }

    pub fn is_not_found(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_not_found)
    }

    pub fn is_retryable(&self) -> bool {
        match self.root() {
            ZendeskError::Network { .. } | ZendeskError::Timeout => true,
            ZendeskError::Api(err) => err.is_retryable(),
            _ => false,
        }
    }

    pub fn help_text(&self) -> Option<&'static str> {
        match self.root() {
            ZendeskError::Api(err) => err.suggestion(),
            ZendeskError::Validation { .. } => {
                Some("Run 'zd instance add' to reconfigure the instance credentials")
            }
            ZendeskError::Network { .. } => Some("Check your internet connection and try again"),
            ZendeskError::Timeout => Some("Try again or check your network connection"),
            ZendeskError::OAuth(err) => err.help_text(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ZendeskError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ZendeskError::Timeout
        } else {
            ZendeskError::Network {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}

impl From<serde_json::Error> for ZendeskError {
    fn from(source: serde_json::Error) -> Self {
        ZendeskError::InvalidResponse {
            context: "decode response".to_string(),
            source,
        }
    }
}

/// A non-2xx response from the Zendesk API
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub description: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.message, description),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Error document shape returned by Zendesk
#[derive(Debug, Deserialize)]
struct RemoteErrorDocument {
    error: RemoteErrorField,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RemoteErrorField {
    Code(String),
    Detailed {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

impl ApiError {
    /// Classify a failed response: structured Zendesk document first, status table otherwise
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        if let Ok(doc) = serde_json::from_slice::<RemoteErrorDocument>(body) {
            let (message, description) = match doc.error {
                RemoteErrorField::Code(code) => (code, doc.description),
                RemoteErrorField::Detailed { title, message } => {
                    (title.unwrap_or_default(), message.or(doc.description))
                }
            };
            if !message.trim().is_empty() {
                return ApiError {
                    status,
                    message,
                    description: description.filter(|d| !d.is_empty()),
                    details: doc.details.filter(|d| !d.is_null()),
                };
            }
        }

        ApiError {
            status,
            message: status_message(status).into_owned(),
            description: raw_description(body),
            details: None,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS.as_u16()
    }

    pub fn is_auth_error(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED.as_u16()
            || self.status == StatusCode::FORBIDDEN.as_u16()
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND.as_u16()
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    pub fn is_retryable(&self) -> bool {
        self.is_rate_limit() || self.is_server_error()
    }

    pub fn suggestion(&self) -> Option<&'static str> {
        match self.status {
            401 => Some("Run 'zd test' to verify your credentials"),
            403 => Some("You may not have permission for this operation"),
            404 => Some("Verify the resource ID exists"),
            422 => Some("Check your input values and required fields"),
            429 => Some(
                "Rate limit exceeded. Wait a moment and try again, or use --refresh less frequently",
            ),
            500..=599 => Some("Zendesk is experiencing issues. Try again later"),
            _ => None,
        }
    }
}

/// Human-readable label for an HTTP status code
pub fn status_message(status: u16) -> Cow<'static, str> {
    match status {
        400 => Cow::Borrowed("Bad Request"),
        401 => Cow::Borrowed("Authentication Failed"),
        403 => Cow::Borrowed("Access Denied"),
        404 => Cow::Borrowed("Resource Not Found"),
        422 => Cow::Borrowed("Invalid Input"),
        429 => Cow::Borrowed("Rate Limit Exceeded"),
        500 => Cow::Borrowed("Zendesk Server Error"),
        502 => Cow::Borrowed("Zendesk Bad Gateway"),
        503 => Cow::Borrowed("Zendesk Service Unavailable"),
        501..=599 => Cow::Borrowed("Zendesk Server Error"),
        other => Cow::Owned(format!("HTTP {other} Error")),
    }
}

fn raw_description(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_DESCRIPTION_LEN).collect())
}

/// Failures of the OAuth authorization-code flow and token refresh
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OAuthError {
    #[error("OAuth state mismatch - possible CSRF attack")]
    StateMismatch,

    #[error("Authorization failed: {error} - {description}")]
    ProviderError { error: String, description: String },

    #[error("No authorization code received")]
    MissingCode,

    #[error("Authorization timeout - no response received within {0} seconds")]
    Timeout(u64),

    #[error("Authorization cancelled")]
    Cancelled,

    #[error("Failed to start callback server: {0}")]
    ListenerBind(String),

    #[error("Failed to exchange authorization code for token: {0}")]
    ExchangeFailed(String),

    #[error("Failed to refresh token: {0}")]
    RefreshFailed(String),

    #[error("Invalid OAuth configuration: {0}")]
    InvalidConfig(String),
}

impl OAuthError {
    pub fn help_text(&self) -> Option<&'static str> {
        match self {
            OAuthError::StateMismatch | OAuthError::MissingCode => {
                Some("Restart the authorization with 'zd reauth'")
            }
            OAuthError::ListenerBind(_) => {
                Some("Make sure nothing else is listening on http://localhost:8080")
            }
            OAuthError::RefreshFailed(_) => {
                Some("The refresh token may be revoked. Run 'zd reauth' to authorize again")
            }
            OAuthError::InvalidConfig(_) => Some(
                "Create an OAuth client in Zendesk Admin Center with redirect URL http://localhost:8080/callback",
            ),
            _ => None,
        }
    }
}
