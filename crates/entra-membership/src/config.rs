//! Configuration for the directory connection and resolution runs.

use secrecy::SecretString;

use crate::error::{MembershipError, MembershipResult};
use crate::retry::RetryConfig;

/// Microsoft cloud environment, selecting login and Graph endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloudEnvironment {
    /// Global commercial cloud.
    #[default]
    Commercial,
    /// US Government (GCC High / DoD).
    UsGovernment,
    /// Azure China (21Vianet).
    China,
}

impl CloudEnvironment {
    /// Base URL of the Microsoft Graph endpoint.
    #[must_use]
    pub fn graph_endpoint(&self) -> &'static str {
        match self {
            Self::Commercial => "https://graph.microsoft.com",
            Self::UsGovernment => "https://graph.microsoft.us",
            Self::China => "https://microsoftgraph.chinacloudapi.cn",
        }
    }

    /// Base URL of the OAuth2 login endpoint.
    #[must_use]
    pub fn login_endpoint(&self) -> &'static str {
        match self {
            Self::Commercial => "https://login.microsoftonline.com",
            Self::UsGovernment => "https://login.microsoftonline.us",
            Self::China => "https://login.chinacloudapi.cn",
        }
    }
}

/// OAuth2 client-credentials for the Graph application.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Application (client) ID.
    pub client_id: String,
    /// Client secret.
    pub client_secret: SecretString,
}

/// Connection settings for the directory service.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Entra tenant ID.
    pub tenant_id: String,
    /// Base URL of the Graph endpoint, without the version segment.
    pub graph_endpoint: String,
    /// Base URL of the OAuth2 login endpoint.
    pub login_endpoint: String,
    /// Graph API version segment.
    pub api_version: String,
    /// `$top` page size for member listing.
    pub page_size: usize,
    /// Retry behavior for remote calls.
    pub retry: RetryConfig,
}

impl DirectoryConfig {
    /// Starts building a configuration for the given tenant.
    #[must_use]
    pub fn builder() -> DirectoryConfigBuilder {
        DirectoryConfigBuilder::default()
    }
}

/// Builder for [`DirectoryConfig`].
#[derive(Debug, Default)]
pub struct DirectoryConfigBuilder {
    tenant_id: Option<String>,
    cloud: CloudEnvironment,
    graph_endpoint: Option<String>,
    login_endpoint: Option<String>,
    api_version: Option<String>,
    page_size: Option<usize>,
    retry: Option<RetryConfig>,
}

impl DirectoryConfigBuilder {
    #[must_use]
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    #[must_use]
    pub fn cloud(mut self, cloud: CloudEnvironment) -> Self {
        self.cloud = cloud;
        self
    }

    /// Overrides the Graph base URL, e.g. for a proxy or a test server.
    /// Defaults to the configured cloud's endpoint.
    #[must_use]
    pub fn graph_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.graph_endpoint = Some(endpoint.into());
        self
    }

    /// Overrides the OAuth2 login base URL. Defaults to the configured
    /// cloud's endpoint.
    #[must_use]
    pub fn login_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.login_endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> MembershipResult<DirectoryConfig> {
        let tenant_id = self
            .tenant_id
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MembershipError::Config("tenant_id is required".into()))?;

        let page_size = self.page_size.unwrap_or(100);
        // Graph rejects $top above 999 on member listings.
        if page_size == 0 || page_size > 999 {
            return Err(MembershipError::Config(format!(
                "page_size must be between 1 and 999, got {page_size}"
            )));
        }

        let retry = self.retry.unwrap_or_default();
        retry.validate()?;

        Ok(DirectoryConfig {
            tenant_id,
            graph_endpoint: self
                .graph_endpoint
                .unwrap_or_else(|| self.cloud.graph_endpoint().to_string()),
            login_endpoint: self
                .login_endpoint
                .unwrap_or_else(|| self.cloud.login_endpoint().to_string()),
            api_version: self.api_version.unwrap_or_else(|| "v1.0".to_string()),
            page_size,
            retry,
        })
    }
}

/// Per-run options for the resolution engine.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Maximum nested-membership hops, in `[1, 50]`.
    pub max_depth: u32,
    /// Include disabled accounts in the result.
    pub include_disabled: bool,
    /// Enrich the visited-group list with display names.
    pub include_group_info: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            include_disabled: false,
            include_group_info: false,
        }
    }
}

impl ResolveOptions {
    /// Validates the options at the run entry point.
    pub fn validate(&self) -> MembershipResult<()> {
        if !(1..=50).contains(&self.max_depth) {
            return Err(MembershipError::InvalidDepth {
                depth: self.max_depth,
            });
        }
        Ok(())
    }
}
