// ABOUTME: Centralized constants for the Zendesk SDK
// ABOUTME: Contains retry configuration, timeouts, cache defaults, and endpoint templates

/// Retry configuration constants
pub mod retry {
    use std::time::Duration;

    /// Maximum number of retry attempts after the first request
    pub const MAX_RETRIES: u32 = 3;

    /// Initial delay before first retry
    pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

    /// Ceiling for any single wait, including server-provided Retry-After
    pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

    /// Backoff multiplier for exponential backoff
    pub const BACKOFF_MULTIPLIER: f64 = 2.0;
}

/// HTTP and request timeouts
pub mod timeouts {
    use std::time::Duration;

    /// Default timeout for HTTP requests
    pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// How long the OAuth flow waits for the browser callback
    pub const OAUTH_CALLBACK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

    /// Grace period for the callback listener to shut down
    pub const OAUTH_LISTENER_SHUTDOWN: Duration = Duration::from_secs(5);
}

/// Response cache defaults
pub mod cache {
    use std::time::Duration;

    /// Default time-to-live for cached responses
    pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

    /// Directory under the home directory holding CLI state
    pub const STATE_DIR: &str = ".zd";

    /// Cache subdirectory inside the state directory
    pub const CACHE_SUBDIR: &str = "cache";

    /// Environment variable overriding the cache directory
    pub const CACHE_DIR_ENV: &str = "ZD_CACHE_DIR";
}

/// Pagination limits enforced by the API
pub mod paging {
    /// Largest page size the API accepts
    pub const MAX_PER_PAGE: u32 = 100;

    /// Page size used when the caller has no preference
    pub const DEFAULT_PER_PAGE: u32 = 30;
}

/// Zendesk URLs
pub mod urls {
    /// Host suffix for every Zendesk account
    pub const ZENDESK_HOST: &str = "zendesk.com";

    /// Versioned REST root appended to the account origin
    pub const API_PATH: &str = "/api/v2";

    /// OAuth authorization path on the account origin
    pub const OAUTH_AUTHORIZE_PATH: &str = "/oauth/authorizations/new";

    /// OAuth token exchange path on the account origin
    pub const OAUTH_TOKEN_PATH: &str = "/oauth/tokens";

    /// Local OAuth callback base URL
    pub const OAUTH_CALLBACK_BASE: &str = "http://localhost";

    /// Local OAuth callback path
    pub const OAUTH_CALLBACK_PATH: &str = "/callback";

    /// Local OAuth callback port
    pub const OAUTH_CALLBACK_PORT: u16 = 8080;

    /// Origin for an account subdomain, e.g. `https://acme.zendesk.com`
    pub fn account_origin(subdomain: &str) -> String {
        format!("https://{subdomain}.{ZENDESK_HOST}")
    }

    /// REST root for an account subdomain
    pub fn api_base(subdomain: &str) -> String {
        format!("{}{API_PATH}", account_origin(subdomain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_retry_constants() {
        assert_eq!(retry::MAX_RETRIES, 3);
        assert_eq!(retry::INITIAL_BACKOFF, Duration::from_secs(1));
        assert_eq!(retry::MAX_BACKOFF, Duration::from_secs(30));
        assert_eq!(retry::BACKOFF_MULTIPLIER, 2.0);
    }

    #[test]
    fn test_timeout_constants() {
        assert_eq!(timeouts::HTTP_REQUEST_TIMEOUT, Duration::from_secs(30));
        assert_eq!(timeouts::OAUTH_CALLBACK_TIMEOUT, Duration::from_secs(300));
    }

    #[test]
    fn test_cache_defaults() {
        assert_eq!(cache::DEFAULT_TTL, Duration::from_secs(600));
        assert_eq!(paging::MAX_PER_PAGE, 100);
    }

    #[test]
    fn test_url_builders() {
        assert_eq!(urls::account_origin("acme"), "https://acme.zendesk.com");
        assert_eq!(urls::api_base("acme"), "https://acme.zendesk.com/api/v2");
        assert_eq!(urls::OAUTH_CALLBACK_BASE, "http://localhost");
    }
}
