//! Microsoft Graph HTTP client with OData pagination.
//!
//! The client performs single requests and maps HTTP failures onto the
//! error taxonomy; retry policy lives in [`crate::retry::RetryExecutor`]
//! so callers decide what is worth retrying.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::auth::TokenCache;
use crate::error::{MembershipError, MembershipResult};

/// `OData` error response envelope.
#[derive(Debug, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorBody,
}

/// `OData` error body.
#[derive(Debug, Deserialize)]
pub struct ODataErrorBody {
    pub code: String,
    pub message: String,
}

/// Paginated `OData` collection response.
#[derive(Debug, Deserialize)]
pub struct ODataResponse<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Microsoft Graph API client.
#[derive(Debug)]
pub struct GraphClient {
    http_client: reqwest::Client,
    token_cache: Arc<TokenCache>,
    base_url: String,
}

impl GraphClient {
    /// Creates a new Graph client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        token_cache: Arc<TokenCache>,
        graph_endpoint: &str,
        api_version: &str,
    ) -> MembershipResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MembershipError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            token_cache,
            base_url: format!("{}/{}", graph_endpoint.trim_end_matches('/'), api_version),
        })
    }

    /// Base URL for Graph API requests, including the API version.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs a single GET request with token injection.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> MembershipResult<T> {
        let token = self.token_cache.get_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&token)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            return response.json().await.map_err(MembershipError::from);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(MembershipError::RateLimited { retry_after_secs });
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ODataError>(&body) {
            Ok(odata) => (odata.error.code, odata.error.message),
            Err(_) => (status.to_string(), body),
        };

        Err(match status {
            reqwest::StatusCode::NOT_FOUND => MembershipError::NotFound(message),
            reqwest::StatusCode::FORBIDDEN => MembershipError::PermissionDenied(message),
            reqwest::StatusCode::UNAUTHORIZED => MembershipError::Auth(message),
            _ => MembershipError::GraphApi {
                status: status.as_u16(),
                code,
                message,
            },
        })
    }

    /// Fetches every page of a collection, handing each page to `callback`
    /// until no `@odata.nextLink` remains.
    #[instrument(skip(self, callback))]
    pub async fn get_paginated<T, F>(&self, initial_url: &str, mut callback: F) -> MembershipResult<()>
    where
        T: DeserializeOwned,
        F: FnMut(Vec<T>) -> MembershipResult<()>,
    {
        let mut url = initial_url.to_string();

        loop {
            debug!(%url, "fetching page");
            let response: ODataResponse<T> = self.get(&url).await?;

            callback(response.value)?;

            match response.next_link {
                Some(next) => url = next,
                None => return Ok(()),
            }
        }
    }
}
