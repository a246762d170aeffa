//! The directory API seam: trait definition and Microsoft Graph implementation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::auth::TokenCache;
use crate::config::{Credentials, DirectoryConfig};
use crate::error::MembershipResult;
use crate::graph_client::GraphClient;
use crate::model::{DirectoryGroup, DirectoryUser, GroupId};
use crate::retry::RetryExecutor;

/// Group fields to select from Graph.
const GROUP_SELECT_FIELDS: &str = "id,displayName,description,mail,securityEnabled,mailEnabled";

/// User fields to select from Graph.
const USER_SELECT_FIELDS: &str =
    "id,displayName,userPrincipalName,mail,jobTitle,department,companyName,accountEnabled";

/// The remote directory operations the resolution engine consumes.
///
/// Member listings are type-filtered on the server side and drained
/// exhaustively; implementations wrap each operation in their own retry
/// policy.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Checks that an authorized session is available. Failure is a
    /// fatal precondition for a run.
    async fn verify_access(&self) -> MembershipResult<()>;

    /// Fetches group metadata by identifier.
    async fn fetch_group(&self, group_id: GroupId) -> MembershipResult<DirectoryGroup>;

    /// Lists the direct user members of a group.
    async fn list_member_users(&self, group_id: GroupId) -> MembershipResult<Vec<DirectoryUser>>;

    /// Lists the direct nested-group members of a group.
    async fn list_member_groups(&self, group_id: GroupId) -> MembershipResult<Vec<DirectoryGroup>>;

    /// Finds groups whose display name matches `name` exactly.
    async fn find_groups_by_name(&self, name: &str) -> MembershipResult<Vec<DirectoryGroup>>;

    /// Remote call attempts made so far, counting each retry separately.
    fn calls_made(&self) -> u64;
}

/// [`DirectoryApi`] implementation over the Microsoft Graph API.
#[derive(Debug)]
pub struct GraphDirectory {
    client: GraphClient,
    retry: RetryExecutor,
    page_size: usize,
}

impl GraphDirectory {
    /// Creates a Graph-backed directory for the configured tenant.
    pub fn new(config: DirectoryConfig, credentials: Credentials) -> MembershipResult<Self> {
        let token_cache = Arc::new(TokenCache::new(
            credentials,
            config.login_endpoint.clone(),
            &config.graph_endpoint,
            config.tenant_id.clone(),
        ));
        let client = GraphClient::new(token_cache, &config.graph_endpoint, &config.api_version)?;

        Ok(Self {
            client,
            retry: RetryExecutor::new(config.retry)?,
            page_size: config.page_size,
        })
    }

    /// Drains a paginated collection of users, skipping entries that do
    /// not parse rather than failing the whole listing.
    async fn drain_users(&self, url: &str) -> MembershipResult<Vec<DirectoryUser>> {
        let mut users = Vec::new();
        self.client
            .get_paginated(url, |page: Vec<serde_json::Value>| {
                for value in page {
                    match DirectoryUser::from_json(&value) {
                        Ok(user) => users.push(user),
                        Err(e) => warn!(error = %e, "skipping unparseable user entry"),
                    }
                }
                Ok(())
            })
            .await?;
        Ok(users)
    }

    /// Drains a paginated collection of groups.
    async fn drain_groups(&self, url: &str) -> MembershipResult<Vec<DirectoryGroup>> {
        let mut groups = Vec::new();
        self.client
            .get_paginated(url, |page: Vec<serde_json::Value>| {
                for value in page {
                    match DirectoryGroup::from_json(&value) {
                        Ok(group) => groups.push(group),
                        Err(e) => warn!(error = %e, "skipping unparseable group entry"),
                    }
                }
                Ok(())
            })
            .await?;
        Ok(groups)
    }
}

#[async_trait]
impl DirectoryApi for GraphDirectory {
    #[instrument(skip(self))]
    async fn verify_access(&self) -> MembershipResult<()> {
        let url = format!("{}/organization?$select=id", self.client.base_url());
        self.retry
            .execute(|| async {
                self.client.get::<serde_json::Value>(&url).await.map(|_| ())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_group(&self, group_id: GroupId) -> MembershipResult<DirectoryGroup> {
        let url = format!(
            "{}/groups/{}?$select={}",
            self.client.base_url(),
            group_id,
            GROUP_SELECT_FIELDS
        );

        let value = self
            .retry
            .execute(|| self.client.get::<serde_json::Value>(&url))
            .await?;
        DirectoryGroup::from_json(&value)
    }

    #[instrument(skip(self))]
    async fn list_member_users(&self, group_id: GroupId) -> MembershipResult<Vec<DirectoryUser>> {
        // OData cast segment filters to user members on the server, so
        // mixed member lists never need client-side discrimination.
        let url = format!(
            "{}/groups/{}/members/microsoft.graph.user?$select={}&$top={}",
            self.client.base_url(),
            group_id,
            USER_SELECT_FIELDS,
            self.page_size
        );

        self.retry.execute(|| self.drain_users(&url)).await
    }

    #[instrument(skip(self))]
    async fn list_member_groups(&self, group_id: GroupId) -> MembershipResult<Vec<DirectoryGroup>> {
        let url = format!(
            "{}/groups/{}/members/microsoft.graph.group?$select={}&$top={}",
            self.client.base_url(),
            group_id,
            GROUP_SELECT_FIELDS,
            self.page_size
        );

        self.retry.execute(|| self.drain_groups(&url)).await
    }

    #[instrument(skip(self))]
    async fn find_groups_by_name(&self, name: &str) -> MembershipResult<Vec<DirectoryGroup>> {
        // Single quotes double up inside OData string literals.
        let filter = format!("displayName eq '{}'", name.replace('\'', "''"));
        let url = format!(
            "{}/groups?$filter={}&$select={}",
            self.client.base_url(),
            urlencoding::encode(&filter),
            GROUP_SELECT_FIELDS
        );

        self.retry.execute(|| self.drain_groups(&url)).await
    }

    fn calls_made(&self) -> u64 {
        self.retry.attempts()
    }
}
