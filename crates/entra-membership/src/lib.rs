//! Effective (transitive) membership resolution for Microsoft Entra ID groups.
//!
//! Given a root group — by object ID or exact display name — this crate
//! walks the nested-group graph over the Microsoft Graph API and
//! aggregates every unique user account reachable through any membership
//! path. Traversal is cycle-safe and depth-bounded, remote calls get
//! bounded retries with exponential backoff and jitter, and per-group
//! failures are collected into the final report instead of aborting the
//! run.
//!
//! # Example
//!
//! ```no_run
//! use entra_membership::{
//!     Credentials, DirectoryConfig, GraphDirectory, MembershipResolver, ResolveOptions,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DirectoryConfig::builder()
//!     .tenant_id("your-tenant-id")
//!     .build()?;
//!
//! let credentials = Credentials {
//!     client_id: "your-client-id".to_string(),
//!     client_secret: "your-client-secret".to_string().into(),
//! };
//!
//! let directory = GraphDirectory::new(config, credentials)?;
//! let resolver = MembershipResolver::new(directory);
//!
//! let report = resolver.run("Engineering", &ResolveOptions::default()).await?;
//! for record in &report.users {
//!     println!("{} (via {})", record.user.display_name, record.source_group_name);
//! }
//! # Ok(())
//! # }
//! ```

mod auth;
mod config;
mod directory;
mod engine;
mod error;
mod graph_client;
mod model;
mod orchestrator;
mod resolver;
mod retry;
mod state;

// Re-exports
pub use auth::TokenCache;
pub use config::{
    CloudEnvironment, Credentials, DirectoryConfig, DirectoryConfigBuilder, ResolveOptions,
};
pub use directory::{DirectoryApi, GraphDirectory};
pub use engine::MembershipEngine;
pub use error::{MembershipError, MembershipResult};
pub use graph_client::{GraphClient, ODataResponse};
pub use model::{
    DirectoryGroup, DirectoryUser, GroupId, GroupSummary, MembershipReport, RunStats, UserRecord,
};
pub use orchestrator::MembershipResolver;
pub use retry::{RetryConfig, RetryExecutor};
pub use state::TraversalState;
