// ABOUTME: Retry logic with exponential backoff for handling transient failures
// ABOUTME: Retries rate limits and server errors, honors Retry-After, stops on cancellation

use crate::constants::retry;
use crate::error::{ApiError, ZendeskError};
use crate::Result;
use log::debug;
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: retry::MAX_RETRIES,
            initial_backoff: retry::INITIAL_BACKOFF,
            max_backoff: retry::MAX_BACKOFF,
            backoff_multiplier: retry::BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryConfig {
    /// Exponential delay for a zero-based retry attempt, capped at `max_backoff`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let millis = self.initial_backoff.as_millis() as f64 * factor;
        if !millis.is_finite() || millis >= self.max_backoff.as_millis() as f64 {
            return self.max_backoff;
        }
        Duration::from_millis(millis as u64)
    }
}

/// Statuses worth another attempt: rate limiting and server errors
pub fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Run `operation` until it yields a non-retryable response or attempts run out.
///
/// A 429 carrying an integer `Retry-After` waits that many seconds (capped at
/// `max_backoff`); other retryable outcomes use exponential backoff. Any
/// response that is not retryable, including 4xx errors, is returned to the
/// caller unchanged.
pub async fn retry_with_backoff<F, Fut>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<Response>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = reqwest::Result<Response>>,
{
    let attempts = config.max_retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(ZendeskError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ZendeskError::Cancelled),
            outcome = operation() => outcome,
        };

        let is_last = attempt + 1 == attempts;
        let wait = match outcome {
            Ok(response) if !should_retry(response.status()) => return Ok(response),
            Ok(response) => {
                let status = response.status();
                if is_last {
                    let body = response.bytes().await.unwrap_or_default();
                    return Err(exhausted(
                        attempts,
                        ApiError::from_response(status.as_u16(), &body).into(),
                    ));
                }
                let server_hint = (status == StatusCode::TOO_MANY_REQUESTS)
                    .then(|| retry_after(&response))
                    .flatten();
                debug!(
                    "Request returned {} (attempt {}/{})",
                    status.as_u16(),
                    attempt + 1,
                    attempts
                );
                match server_hint {
                    Some(hint) => hint.min(config.max_backoff),
                    None => config.backoff(attempt),
                }
            }
            Err(error) => {
                if is_last {
                    return Err(exhausted(attempts, error.into()));
                }
                debug!(
                    "Request failed (attempt {}/{}): {}",
                    attempt + 1,
                    attempts,
                    error
                );
                config.backoff(attempt)
            }
        };

        debug!("Retrying in {:?}", wait);
        tokio::select! {
            _ = cancel.cancelled() => return Err(ZendeskError::Cancelled),
            _ = sleep(wait) => {}
        }
        attempt += 1;
    }
}

fn exhausted(attempts: u32, last: ZendeskError) -> ZendeskError {
    ZendeskError::RetriesExhausted {
        attempts,
        last: Box::new(last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(20),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.max_backoff, Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_growth_and_cap() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff(0), Duration::from_secs(1));
        assert_eq!(config.backoff(1), Duration::from_secs(2));
        assert_eq!(config.backoff(2), Duration::from_secs(4));
        assert_eq!(config.backoff(10), Duration::from_secs(30));
    }

    #[test]
    fn test_should_retry() {
        assert!(should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(should_retry(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!should_retry(StatusCode::OK));
        assert!(!should_retry(StatusCode::NOT_FOUND));
        assert!(!should_retry(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/ok", server.url());
        let response = retry_with_backoff(&fast_config(3), &CancellationToken::new(), || {
            client.get(&url).send()
        })
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/missing", server.url());
        let response = retry_with_backoff(&fast_config(3), &CancellationToken::new(), || {
            client.get(&url).send()
        })
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_with_retry_after_then_success() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("GET", "/limited")
            .with_status(429)
            .with_header("Retry-After", "0")
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let calls = Arc::new(AtomicU32::new(0));
        let base = server.url();
        let response = retry_with_backoff(&fast_config(3), &CancellationToken::new(), || {
            let path = if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                "limited"
            } else {
                "ok"
            };
            client.get(format!("{base}/{path}")).send()
        })
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        limited.assert_async().await;
        ok.assert_async().await;
    }

    /// Time a single 429 (with the given `Retry-After`) followed by a success
    async fn time_rate_limited_call(retry_after: &str, config: &RetryConfig) -> Duration {
        let mut server = mockito::Server::new_async().await;
        let _limited = server
            .mock("GET", "/limited")
            .with_status(429)
            .with_header("Retry-After", retry_after)
            .create_async()
            .await;
        let _ok = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let calls = AtomicU32::new(0);
        let base = server.url();
        let started = std::time::Instant::now();
        let response = retry_with_backoff(config, &CancellationToken::new(), || {
            let path = if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                "limited"
            } else {
                "ok"
            };
            client.get(format!("{base}/{path}")).send()
        })
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        started.elapsed()
    }

    #[tokio::test]
    async fn test_retry_after_is_honored() {
        let config = RetryConfig {
            max_backoff: Duration::from_secs(10),
            ..fast_config(3)
        };
        let elapsed = time_rate_limited_call("1", &config).await;

        assert!(elapsed >= Duration::from_secs(1), "waited only {elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "waited {elapsed:?}");
    }

    #[tokio::test]
    async fn test_retry_after_is_capped_by_max_backoff() {
        let config = RetryConfig {
            max_backoff: Duration::from_millis(50),
            ..fast_config(3)
        };
        let elapsed = time_rate_limited_call("2", &config).await;

        assert!(elapsed < Duration::from_secs(1), "waited {elapsed:?}");
    }

    #[tokio::test]
    async fn test_retries_exhausted_on_persistent_server_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/down")
            .with_status(503)
            .with_body("maintenance")
            .expect(3)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/down", server.url());
        let error = retry_with_backoff(&fast_config(2), &CancellationToken::new(), || {
            client.get(&url).send()
        })
        .await
        .unwrap_err();

        match &error {
            ZendeskError::RetriesExhausted { attempts, last } => {
                assert_eq!(*attempts, 3);
                assert_eq!(last.status(), Some(503));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert!(error.is_retryable());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cancel_during_wait() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/limited")
            .with_status(429)
            .with_header("Retry-After", "30")
            .create_async()
            .await;

        let config = RetryConfig {
            max_backoff: Duration::from_secs(30),
            ..fast_config(3)
        };
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let client = reqwest::Client::new();
        let url = format!("{}/limited", server.url());
        let started = std::time::Instant::now();
        let error = retry_with_backoff(&config, &cancel, || client.get(&url).send())
            .await
            .unwrap_err();

        assert!(matches!(error, ZendeskError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_request() {
        let calls = AtomicU32::new(0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let client = reqwest::Client::new();
        let error = retry_with_backoff(&fast_config(3), &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            client.get("http://127.0.0.1:9/never").send()
        })
        .await
        .unwrap_err();

        assert!(matches!(error, ZendeskError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
