//! OAuth2 client-credentials authentication for Microsoft Graph.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::config::Credentials;
use crate::error::{MembershipError, MembershipResult};

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// An acquired access token with its expiry.
#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// True while the token remains usable beyond the refresh margin.
    fn is_fresh(&self, margin: Duration) -> bool {
        Utc::now() + margin < self.expires_at
    }
}

/// Acquires and caches Graph access tokens via the client-credentials flow.
#[derive(Debug)]
pub struct TokenCache {
    credentials: Credentials,
    login_endpoint: String,
    /// OAuth2 scope, derived from the Graph endpoint.
    scope: String,
    tenant_id: String,
    http_client: reqwest::Client,
    current: RwLock<Option<AccessToken>>,
    /// Refresh this long before actual expiry.
    refresh_margin: Duration,
}

impl TokenCache {
    /// Creates a new token cache for the tenant, authenticating against
    /// `login_endpoint` and requesting tokens scoped to `graph_endpoint`.
    #[must_use]
    pub fn new(
        credentials: Credentials,
        login_endpoint: String,
        graph_endpoint: &str,
        tenant_id: String,
    ) -> Self {
        Self {
            credentials,
            login_endpoint,
            scope: format!("{}/.default", graph_endpoint.trim_end_matches('/')),
            tenant_id,
            http_client: reqwest::Client::new(),
            current: RwLock::new(None),
            refresh_margin: Duration::minutes(5),
        }
    }

    /// Returns a valid access token, refreshing it when close to expiry.
    #[instrument(skip(self), fields(tenant_id = %self.tenant_id))]
    pub async fn get_token(&self) -> MembershipResult<String> {
        {
            let cached = self.current.read().await;
            if let Some(ref token) = *cached {
                if token.is_fresh(self.refresh_margin) {
                    return Ok(token.value.clone());
                }
            }
        }

        debug!("acquiring new access token");
        let token = self.acquire().await?;
        let value = token.value.clone();

        let mut cached = self.current.write().await;
        *cached = Some(token);

        Ok(value)
    }

    /// Drops the cached token so the next use acquires a fresh one.
    pub async fn invalidate(&self) {
        let mut cached = self.current.write().await;
        *cached = None;
    }

    #[instrument(skip(self))]
    async fn acquire(&self) -> MembershipResult<AccessToken> {
        use secrecy::ExposeSecret;

        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_endpoint.trim_end_matches('/'),
            self.tenant_id
        );

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", &self.credentials.client_id),
            ("client_secret", self.credentials.client_secret.expose_secret()),
            ("scope", &self.scope),
        ];

        let response = self
            .http_client
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| MembershipError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MembershipError::Auth(format!(
                "token request failed with status {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| MembershipError::Auth(format!("malformed token response: {e}")))?;

        let expires_at = Utc::now() + Duration::seconds(token_response.expires_in);
        debug!(%expires_at, "acquired access token");

        Ok(AccessToken {
            value: token_response.access_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_fresh_within_margin() {
        let token = AccessToken {
            value: "t".to_string(),
            expires_at: Utc::now() + Duration::minutes(30),
        };

        assert!(token.is_fresh(Duration::minutes(5)));
        assert!(!token.is_fresh(Duration::minutes(45)));
    }

    #[test]
    fn test_expired_token_never_fresh() {
        let token = AccessToken {
            value: "t".to_string(),
            expires_at: Utc::now() - Duration::seconds(1),
        };

        assert!(!token.is_fresh(Duration::zero()));
    }
}
