//! Run orchestration: precondition checks, engine invocation, and
//! report assembly.

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::config::ResolveOptions;
use crate::directory::DirectoryApi;
use crate::engine::MembershipEngine;
use crate::error::MembershipResult;
use crate::model::{GroupSummary, MembershipReport, RunStats};
use crate::resolver;
use crate::state::TraversalState;

/// Placeholder display name when best-effort enrichment fails.
const UNAVAILABLE: &str = "<unavailable>";

/// Drives a complete resolution run against a directory.
///
/// A run only fails for precondition problems: no authorized session,
/// an invalid root reference, or out-of-range options. Failures inside
/// the traversal are collected in the report's error log instead.
pub struct MembershipResolver<D> {
    directory: D,
}

impl<D: DirectoryApi> MembershipResolver<D> {
    /// Creates a resolver over the given directory.
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Borrow of the underlying directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Resolves the effective membership of `root` (an object ID or an
    /// exact display name).
    #[instrument(skip(self, options), fields(max_depth = options.max_depth))]
    pub async fn run(
        &self,
        root: &str,
        options: &ResolveOptions,
    ) -> MembershipResult<MembershipReport> {
        options.validate()?;
        self.directory.verify_access().await?;

        let root_id = resolver::resolve_root(&self.directory, root).await?;
        info!(%root_id, "starting membership resolution");

        let mut state = TraversalState::new();
        let engine = MembershipEngine::new(&self.directory, options);

        let started_at = Utc::now();
        engine.expand(root_id, 0, &mut state).await;
        let finished_at = Utc::now();

        let groups_processed = state.groups_processed();
        let users_found = state.users_found();
        let (mut users, visited, errors) = state.into_parts();

        // Case-sensitive lexical order by display name, with the object
        // ID as a tie-break so equal names order deterministically.
        users.sort_by(|a, b| {
            a.user
                .display_name
                .cmp(&b.user.display_name)
                .then_with(|| a.user.id.cmp(&b.user.id))
        });

        let mut groups = Vec::with_capacity(visited.len());
        for group_id in visited {
            let display_name = if options.include_group_info {
                match self.directory.fetch_group(group_id).await {
                    Ok(group) => Some(group.display_name),
                    Err(e) => {
                        // Enrichment is best-effort; a miss degrades to
                        // a placeholder instead of failing the report.
                        debug!(%group_id, error = %e, "group enrichment failed");
                        Some(UNAVAILABLE.to_string())
                    }
                }
            } else {
                None
            };
            groups.push(GroupSummary {
                id: group_id,
                display_name,
            });
        }

        let stats = RunStats {
            groups_processed,
            api_calls: self.directory.calls_made(),
            users_found,
            errors: errors.len() as u64,
            started_at,
            finished_at,
        };

        info!(
            groups = stats.groups_processed,
            users = stats.users_found,
            errors = stats.errors,
            api_calls = stats.api_calls,
            "membership resolution finished"
        );

        Ok(MembershipReport {
            users,
            groups,
            stats,
            errors,
        })
    }
}
