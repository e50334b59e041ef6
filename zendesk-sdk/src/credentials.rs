// ABOUTME: Credential record for a Zendesk instance and authorization header derivation
// ABOUTME: Validates the fields each authentication mode requires before a client is built

use crate::error::ZendeskError;
use crate::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

/// How requests to an instance authenticate
#[derive(Debug, Clone)]
pub enum AuthMode {
    Token {
        email: String,
        api_token: SecretString,
    },
    OAuth {
        client_id: String,
        client_secret: SecretString,
        access_token: SecretString,
        refresh_token: SecretString,
        expiry: Option<DateTime<Utc>>,
    },
}

impl AuthMode {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMode::Token { .. } => "token",
            AuthMode::OAuth { .. } => "oauth",
        }
    }
}

/// Tokens produced by an OAuth exchange or refresh
#[derive(Debug, Clone)]
pub struct OAuthTokens {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A named Zendesk account plus the credentials used to reach it
#[derive(Debug, Clone)]
pub struct Instance {
    pub name: String,
    pub subdomain: String,
    pub auth: AuthMode,
}

impl Instance {
    pub fn with_token(
        name: impl Into<String>,
        subdomain: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            subdomain: subdomain.into(),
            auth: AuthMode::Token {
                email: email.into(),
                api_token: SecretString::from(api_token.into()),
            },
        }
    }

    /// Check that the declared mode carries every field it needs
    pub fn validate(&self) -> Result<()> {
        if self.subdomain.trim().is_empty() {
            return Err(ZendeskError::validation("subdomain", "subdomain is required"));
        }

        match &self.auth {
            AuthMode::Token { email, api_token } => {
                if email.trim().is_empty() {
                    return Err(ZendeskError::validation(
                        "email",
                        "email is required for token authentication",
                    ));
                }
                if api_token.expose_secret().is_empty() {
                    return Err(ZendeskError::validation(
                        "api_token",
                        "API token is required for token authentication",
                    ));
                }
            }
            AuthMode::OAuth {
                client_id,
                client_secret,
                access_token,
                refresh_token,
                expiry,
            } => {
                if access_token.expose_secret().is_empty() {
                    return Err(ZendeskError::validation(
                        "access_token",
                        "OAuth access token is required",
                    ));
                }
                if refresh_token.expose_secret().is_empty() {
                    return Err(ZendeskError::validation(
                        "refresh_token",
                        "OAuth refresh token is required",
                    ));
                }
                if expiry.is_none() {
                    return Err(ZendeskError::validation(
                        "expiry",
                        "OAuth token expiry is required",
                    ));
                }
                if client_id.trim().is_empty() {
                    return Err(ZendeskError::validation(
                        "client_id",
                        "OAuth client ID is required",
                    ));
                }
                if client_secret.expose_secret().is_empty() {
                    return Err(ZendeskError::validation(
                        "client_secret",
                        "OAuth client secret is required",
                    ));
                }
            }
        }

        Ok(())
    }

    /// The `Authorization` header value for the configured mode
    pub fn authorization_header(&self) -> String {
        match &self.auth {
            AuthMode::Token { email, api_token } => {
                let raw = format!("{}/token:{}", email, api_token.expose_secret());
                format!("Basic {}", STANDARD.encode(raw))
            }
            AuthMode::OAuth { access_token, .. } => {
                format!("Bearer {}", access_token.expose_secret())
            }
        }
    }

    /// True when an OAuth access token has passed its expiry
    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        match &self.auth {
            AuthMode::OAuth {
                expiry: Some(expiry),
                ..
            } => *expiry <= now,
            _ => false,
        }
    }

    /// Store freshly issued OAuth tokens; a missing refresh token keeps the old one
    pub fn apply_tokens(&mut self, tokens: &OAuthTokens) {
        if let AuthMode::OAuth {
            access_token,
            refresh_token,
            expiry,
            ..
        } = &mut self.auth
        {
            *access_token = tokens.access_token.clone();
            if let Some(refresh) = &tokens.refresh_token {
                *refresh_token = refresh.clone();
            }
            *expiry = tokens.expires_at;
        }
    }
}

/// Treat zero or negative caller-supplied ids as "not set"
pub fn normalize_optional_id(id: Option<i64>) -> Option<i64> {
    id.filter(|value| *value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn oauth_instance() -> Instance {
        Instance {
            name: "work".to_string(),
            subdomain: "acme".to_string(),
            auth: AuthMode::OAuth {
                client_id: "zd_cli".to_string(),
                client_secret: SecretString::from("shh".to_string()),
                access_token: SecretString::from("access-1".to_string()),
                refresh_token: SecretString::from("refresh-1".to_string()),
                expiry: Some(Utc::now() + Duration::hours(1)),
            },
        }
    }

    fn failing_field(instance: &Instance) -> &'static str {
        match instance.validate() {
            Err(ZendeskError::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_basic_auth_header() {
        let instance = Instance::with_token("work", "acme", "a@b.com", "tok123");
        assert_eq!(
            instance.authorization_header(),
            format!("Basic {}", STANDARD.encode("a@b.com/token:tok123"))
        );
        assert_eq!(
            instance.authorization_header(),
            "Basic YUBiLmNvbS90b2tlbjp0b2sxMjM="
        );
    }

    #[test]
    fn test_bearer_auth_header() {
        assert_eq!(oauth_instance().authorization_header(), "Bearer access-1");
    }

    #[test]
    fn test_token_mode_validation() {
        assert!(Instance::with_token("w", "acme", "a@b.com", "t").validate().is_ok());
        assert_eq!(
            failing_field(&Instance::with_token("w", "acme", "", "t")),
            "email"
        );
        assert_eq!(
            failing_field(&Instance::with_token("w", "acme", "a@b.com", "")),
            "api_token"
        );
        assert_eq!(
            failing_field(&Instance::with_token("w", " ", "a@b.com", "t")),
            "subdomain"
        );
    }

    #[test]
    fn test_oauth_mode_validation_names_field() {
        assert!(oauth_instance().validate().is_ok());

        let mut instance = oauth_instance();
        if let AuthMode::OAuth { expiry, .. } = &mut instance.auth {
            *expiry = None;
        }
        assert_eq!(failing_field(&instance), "expiry");

        let mut instance = oauth_instance();
        if let AuthMode::OAuth { access_token, .. } = &mut instance.auth {
            *access_token = SecretString::from(String::new());
        }
        assert_eq!(failing_field(&instance), "access_token");

        let mut instance = oauth_instance();
        if let AuthMode::OAuth { client_secret, .. } = &mut instance.auth {
            *client_secret = SecretString::from(String::new());
        }
        assert_eq!(failing_field(&instance), "client_secret");
    }

    #[test]
    fn test_apply_tokens_keeps_refresh_when_absent() {
        let mut instance = oauth_instance();
        let expires_at = Utc::now() + Duration::hours(2);
        instance.apply_tokens(&OAuthTokens {
            access_token: SecretString::from("access-2".to_string()),
            refresh_token: None,
            expires_at: Some(expires_at),
        });

        match &instance.auth {
            AuthMode::OAuth {
                access_token,
                refresh_token,
                expiry,
                ..
            } => {
                assert_eq!(access_token.expose_secret(), "access-2");
                assert_eq!(refresh_token.expose_secret(), "refresh-1");
                assert_eq!(*expiry, Some(expires_at));
            }
            AuthMode::Token { .. } => panic!("mode changed"),
        }
    }

    #[test]
    fn test_token_expired() {
        let now = Utc::now();
        let mut instance = oauth_instance();
        assert!(!instance.token_expired(now));
        if let AuthMode::OAuth { expiry, .. } = &mut instance.auth {
            *expiry = Some(now - Duration::minutes(1));
        }
        assert!(instance.token_expired(now));
        assert!(!Instance::with_token("w", "acme", "a@b.com", "t").token_expired(now));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", Instance::with_token("w", "acme", "a@b.com", "tok123"));
        assert!(!debug.contains("tok123"));
    }

    #[test]
    fn test_normalize_optional_id() {
        assert_eq!(normalize_optional_id(Some(0)), None);
        assert_eq!(normalize_optional_id(Some(-4)), None);
        assert_eq!(normalize_optional_id(None), None);
        assert_eq!(normalize_optional_id(Some(42)), Some(42));
    }
}
