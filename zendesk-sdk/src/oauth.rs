// ABOUTME: OAuth2 authorization-code flow against a Zendesk account with a local callback listener
// ABOUTME: Tracks flow state, verifies CSRF state, exchanges and refreshes tokens

use crate::constants::{timeouts, urls};
use crate::credentials::OAuthTokens;
use crate::error::OAuthError;
use chrono::{Duration as ChronoDuration, Utc};
use log::{debug, warn};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl,
    RefreshToken, Scope, TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tiny_http::{Header, Request, Response, Server};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use url::Url;

type OAuthResult<T> = std::result::Result<T, OAuthError>;

// Type alias for the OAuth client with all its type state parameters
type ConfiguredClient = oauth2::Client<
    oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>,
    oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>,
    oauth2::EndpointSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

/// Refresh tokens that expire within this window
const EXPIRY_SKEW: ChronoDuration = ChronoDuration::seconds(60);

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>zd - Authorization Successful</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 4em;">
<h1>Authorization Successful!</h1>
<p>You can close this window and return to the terminal.</p>
<p>zd is now authorized to access your Zendesk instance.</p>
</body>
</html>"#;

/// Where and how to authorize against one Zendesk account
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub subdomain: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// Local callback port; 0 picks a free port
    pub redirect_port: u16,
    pub scopes: Vec<String>,
    pub callback_timeout: Duration,
    /// Replaces `https://{subdomain}.zendesk.com` for the authorize and token endpoints
    pub endpoint_base: Option<String>,
}

impl OAuthSettings {
    pub fn new(
        subdomain: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        Self {
            subdomain: subdomain.into(),
            client_id: client_id.into(),
            client_secret,
            redirect_port: urls::OAUTH_CALLBACK_PORT,
            scopes: vec!["read".to_string(), "write".to_string()],
            callback_timeout: timeouts::OAUTH_CALLBACK_TIMEOUT,
            endpoint_base: None,
        }
    }

    pub fn validate(&self) -> OAuthResult<()> {
        if self.subdomain.trim().is_empty() {
            return Err(OAuthError::InvalidConfig("subdomain is required".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(OAuthError::InvalidConfig(
                "OAuth client ID is required".to_string(),
            ));
        }
        if self.client_secret.expose_secret().is_empty() {
            return Err(OAuthError::InvalidConfig(
                "OAuth client secret is required".to_string(),
            ));
        }
        Ok(())
    }

    fn origin(&self) -> String {
        match &self.endpoint_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => urls::account_origin(&self.subdomain),
        }
    }

    fn redirect_url(&self, port: u16) -> String {
        format!(
            "{}:{}{}",
            urls::OAUTH_CALLBACK_BASE,
            port,
            urls::OAUTH_CALLBACK_PATH
        )
    }

    fn client(&self, port: u16) -> OAuthResult<ConfiguredClient> {
        self.validate()?;
        let origin = self.origin();
        let invalid = |e: url::ParseError| OAuthError::InvalidConfig(e.to_string());

        let auth_url =
            AuthUrl::new(format!("{origin}{}", urls::OAUTH_AUTHORIZE_PATH)).map_err(invalid)?;
        let token_url =
            TokenUrl::new(format!("{origin}{}", urls::OAUTH_TOKEN_PATH)).map_err(invalid)?;
        let redirect_url = RedirectUrl::new(self.redirect_url(port)).map_err(invalid)?;

        Ok(BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                self.client_secret.expose_secret().to_string(),
            ))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url))
    }
}

/// Stages of the authorization-code flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AuthUrlIssued,
    AwaitingCallback,
    CodeReceived,
    CallbackError,
    Timeout,
    Cancelled,
    TokenExchanged,
    Failed,
}

pub struct OAuthFlow {
    settings: OAuthSettings,
    state: FlowState,
    history: Vec<FlowState>,
}

impl OAuthFlow {
    pub fn new(settings: OAuthSettings) -> OAuthResult<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            state: FlowState::Idle,
            history: vec![FlowState::Idle],
        })
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Every state the flow has passed through, oldest first
    pub fn history(&self) -> &[FlowState] {
        &self.history
    }

    fn transition(&mut self, next: FlowState) {
        debug!("OAuth flow: {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    /// Run the whole flow: listen for the browser callback, then exchange the code.
    ///
    /// `on_auth_url` receives the authorization URL once the listener is ready;
    /// the caller is expected to show it and open a browser. The first of
    /// callback, cancellation and timeout decides the outcome, and the listener
    /// is always shut down before this returns.
    pub async fn run<F>(
        &mut self,
        cancel: &CancellationToken,
        on_auth_url: F,
    ) -> OAuthResult<OAuthTokens>
    where
        F: FnOnce(&Url),
    {
        let server = match Server::http(("127.0.0.1", self.settings.redirect_port)) {
            Ok(server) => Arc::new(server),
            Err(e) => {
                self.transition(FlowState::Failed);
                return Err(OAuthError::ListenerBind(e.to_string()));
            }
        };
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or(self.settings.redirect_port);

        let client = match self.settings.client(port) {
            Ok(client) => client,
            Err(e) => {
                server.unblock();
                self.transition(FlowState::Failed);
                return Err(e);
            }
        };

        let mut request = client.authorize_url(CsrfToken::new_random);
        for scope in &self.settings.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        let (auth_url, csrf_token) = request.url();
        self.transition(FlowState::AuthUrlIssued);

        let (sender, receiver) = oneshot::channel();
        let slot = Arc::new(Mutex::new(Some(sender)));
        let listener = {
            let server = Arc::clone(&server);
            let expected_state = csrf_token.secret().clone();
            std::thread::spawn(move || serve_callbacks(&server, &expected_state, &slot))
        };
        self.transition(FlowState::AwaitingCallback);
        on_auth_url(&auth_url);

        let timeout = self.settings.callback_timeout;
        let outcome = tokio::select! {
            received = receiver => received.unwrap_or_else(|_| {
                Err(OAuthError::ListenerBind("callback listener stopped unexpectedly".to_string()))
            }),
            _ = cancel.cancelled() => Err(OAuthError::Cancelled),
            _ = tokio::time::sleep(timeout) => Err(OAuthError::Timeout(timeout.as_secs())),
        };

        shutdown_listener(&server, listener).await;

        let code = match outcome {
            Ok(code) => code,
            Err(e) => {
                self.transition(match e {
                    OAuthError::StateMismatch
                    | OAuthError::ProviderError { .. }
                    | OAuthError::MissingCode => FlowState::CallbackError,
                    OAuthError::Timeout(_) => FlowState::Timeout,
                    OAuthError::Cancelled => FlowState::Cancelled,
                    _ => FlowState::Failed,
                });
                return Err(e);
            }
        };
        self.transition(FlowState::CodeReceived);

        let http = match http_client() {
            Ok(http) => http,
            Err(e) => {
                self.transition(FlowState::Failed);
                return Err(OAuthError::ExchangeFailed(e));
            }
        };
        let exchange = client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&http);
        let token = tokio::select! {
            token = exchange => token,
            _ = cancel.cancelled() => {
                self.transition(FlowState::Cancelled);
                return Err(OAuthError::Cancelled);
            }
        };

        match token {
            Ok(token) => {
                self.transition(FlowState::TokenExchanged);
                Ok(tokens_from_response(&token, None))
            }
            Err(e) => {
                self.transition(FlowState::Failed);
                Err(OAuthError::ExchangeFailed(e.to_string()))
            }
        }
    }
}

/// Exchange the refresh token when the access token is expired or about to be
pub async fn refresh_token(
    settings: &OAuthSettings,
    tokens: &OAuthTokens,
) -> OAuthResult<OAuthTokens> {
    let needs_refresh = tokens
        .expires_at
        .is_some_and(|expires_at| expires_at <= Utc::now() + EXPIRY_SKEW);
    if !needs_refresh {
        return Ok(tokens.clone());
    }

    let refresh = tokens
        .refresh_token
        .as_ref()
        .filter(|token| !token.expose_secret().is_empty())
        .ok_or_else(|| OAuthError::RefreshFailed("no refresh token available".to_string()))?;

    let client = settings.client(urls::OAUTH_CALLBACK_PORT)?;
    let http = http_client().map_err(OAuthError::RefreshFailed)?;
    debug!("Refreshing OAuth access token for {}", settings.subdomain);

    let response = client
        .exchange_refresh_token(&RefreshToken::new(refresh.expose_secret().to_string()))
        .request_async(&http)
        .await
        .map_err(|e| OAuthError::RefreshFailed(e.to_string()))?;

    Ok(tokens_from_response(&response, tokens.refresh_token.clone()))
}

/// Best-effort browser launch for the authorization URL
pub fn open_browser(url: &Url) -> bool {
    match open::that(url.as_str()) {
        Ok(()) => true,
        Err(e) => {
            debug!("Could not open browser: {}", e);
            false
        }
    }
}

fn http_client() -> std::result::Result<oauth2::reqwest::Client, String> {
    oauth2::reqwest::ClientBuilder::new()
        .redirect(oauth2::reqwest::redirect::Policy::none())
        .timeout(timeouts::HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| e.to_string())
}

fn tokens_from_response<T>(response: &T, previous_refresh: Option<SecretString>) -> OAuthTokens
where
    T: TokenResponse,
{
    let expires_at = response
        .expires_in()
        .and_then(|lifetime| ChronoDuration::from_std(lifetime).ok())
        .map(|lifetime| Utc::now() + lifetime);

    OAuthTokens {
        access_token: SecretString::from(response.access_token().secret().to_string()),
        refresh_token: response
            .refresh_token()
            .map(|token| SecretString::from(token.secret().to_string()))
            .or(previous_refresh),
        expires_at,
    }
}

type OutcomeSlot = Mutex<Option<oneshot::Sender<OAuthResult<String>>>>;

/// Listener loop; ends when the server is unblocked
fn serve_callbacks(server: &Server, expected_state: &str, slot: &OutcomeSlot) {
    for request in server.incoming_requests() {
        handle_request(request, expected_state, slot);
    }
    debug!("OAuth callback listener stopped");
}

fn handle_request(request: Request, expected_state: &str, slot: &OutcomeSlot) {
    let target = request.url().to_string();
    let path = target.split('?').next().unwrap_or_default();
    if path != urls::OAUTH_CALLBACK_PATH {
        let _ = request.respond(Response::empty(404));
        return;
    }

    let sender = slot
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    let Some(sender) = sender else {
        let _ = request.respond(
            html_response("<p>This authorization request was already handled.</p>")
                .with_status_code(409),
        );
        return;
    };

    let outcome = parse_callback(&target, expected_state);
    let response = match &outcome {
        Ok(_) => html_response(SUCCESS_PAGE),
        Err(e) => html_response(&format!("<h1>Authorization failed</h1><p>{}</p>", e))
            .with_status_code(400),
    };
    if let Err(e) = request.respond(response) {
        warn!("Failed to answer OAuth callback: {}", e);
    }
    let _ = sender.send(outcome);
}

fn html_response(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let response = Response::from_string(body);
    match Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

/// Interpret the callback query: CSRF state first, then provider errors, then the code
fn parse_callback(target: &str, expected_state: &str) -> OAuthResult<String> {
    let url = Url::parse(&format!("{}{}", urls::OAUTH_CALLBACK_BASE, target))
        .map_err(|_| OAuthError::MissingCode)?;

    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if param("state").as_deref() != Some(expected_state) {
        return Err(OAuthError::StateMismatch);
    }

    if let Some(error) = param("error").filter(|e| !e.is_empty()) {
        return Err(OAuthError::ProviderError {
            error,
            description: param("error_description").unwrap_or_default(),
        });
    }

    param("code")
        .filter(|code| !code.is_empty())
        .ok_or(OAuthError::MissingCode)
}

async fn shutdown_listener(server: &Server, listener: JoinHandle<()>) {
    server.unblock();
    let join = tokio::task::spawn_blocking(move || listener.join());
    match tokio::time::timeout(timeouts::OAUTH_LISTENER_SHUTDOWN, join).await {
        Ok(_) => debug!("OAuth callback listener shut down"),
        Err(_) => warn!("OAuth callback listener did not stop within the grace period"),
    }
}
