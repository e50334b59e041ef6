// ABOUTME: Builder pattern implementation for ZendeskClient configuration
// ABOUTME: Provides type-safe configuration with compile-time required fields

use crate::client::ZendeskClient;
use crate::constants::{cache, timeouts};
use crate::credentials::Instance;
use crate::error::ZendeskError;
use crate::retry::RetryConfig;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

#[derive(Debug, TypedBuilder)]
#[builder(build_method(into = Result<ZendeskClient, ZendeskError>))]
pub struct ZendeskClientConfig<'a> {
    pub instance: &'a Instance,

    #[builder(default = true)]
    pub use_cache: bool,

    #[builder(default = timeouts::HTTP_REQUEST_TIMEOUT)]
    pub timeout: Duration,

    /// Retry rate limits and server errors; `None` sends each request once
    #[builder(default, setter(strip_option(fallback = retry_opt)))]
    pub retry: Option<RetryConfig>,

    /// Overrides `https://{subdomain}.zendesk.com/api/v2`
    #[builder(default, setter(strip_option(fallback = base_url_opt), into))]
    pub base_url: Option<String>,

    #[builder(default, setter(strip_option(fallback = cache_dir_opt), into))]
    pub cache_dir: Option<PathBuf>,

    #[builder(default = cache::DEFAULT_TTL)]
    pub cache_ttl: Duration,

    #[builder(default)]
    pub cancel: CancellationToken,
}

impl From<ZendeskClientConfig<'_>> for Result<ZendeskClient, ZendeskError> {
    fn from(config: ZendeskClientConfig<'_>) -> Self {
        ZendeskClient::from_config(config)
    }
}

impl ZendeskClient {
    pub fn builder<'a>() -> ZendeskClientConfigBuilder<'a, ((), (), (), (), (), (), (), ())> {
        ZendeskClientConfig::builder()
    }
}
