//! The recursive membership engine: cycle-safe, depth-bounded,
//! depth-first expansion of nested groups.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, error};

use crate::config::ResolveOptions;
use crate::directory::DirectoryApi;
use crate::error::MembershipResult;
use crate::model::GroupId;
use crate::state::TraversalState;

/// Depth-first traversal over the nested-group graph.
///
/// Each group passes through `Unseen -> Visiting -> Done`; a group is
/// marked visiting before its members are fetched, and never returns to
/// unseen within a run. A group whose processing fails stays visited,
/// so it is not retried.
pub struct MembershipEngine<'a, D> {
    directory: &'a D,
    options: &'a ResolveOptions,
}

impl<'a, D: DirectoryApi> MembershipEngine<'a, D> {
    /// Creates an engine over the given directory.
    pub fn new(directory: &'a D, options: &'a ResolveOptions) -> Self {
        Self { directory, options }
    }

    /// Expands `group_id` at `depth`, recording discovered users into
    /// `state` and recursing into nested groups.
    ///
    /// Per-group failures are appended to the state's error log and
    /// swallowed; one unreachable group must not abort the closure
    /// computation for its siblings.
    pub fn expand<'s>(
        &'s self,
        group_id: GroupId,
        depth: u32,
        state: &'s mut TraversalState,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 's>> {
        Box::pin(async move {
            // Both guards run before any remote call, so nodes that are
            // too deep or already seen cost no I/O.
            if depth >= self.options.max_depth {
                debug!(%group_id, depth, max_depth = self.options.max_depth, "depth limit reached, not expanding");
                return;
            }

            if state.is_visited(&group_id) {
                debug!(%group_id, depth, "group already visited, skipping");
                return;
            }

            // Visited must be marked before fetching members; this is
            // what makes a cycle back to this group short-circuit above.
            state.mark_visited(group_id);

            let nested = match self.process_group(group_id, depth, state).await {
                Ok(nested) => nested,
                Err(e) => {
                    error!(%group_id, depth, error = %e, "failed to process group");
                    state.record_error(format!("group {group_id} at depth {depth}: {e}"));
                    return;
                }
            };

            for child in nested {
                self.expand(child, depth + 1, state).await;
            }
        })
    }

    /// Fetches one group's metadata and members, returning the nested
    /// groups to recurse into.
    async fn process_group(
        &self,
        group_id: GroupId,
        depth: u32,
        state: &mut TraversalState,
    ) -> MembershipResult<Vec<GroupId>> {
        let group = self.directory.fetch_group(group_id).await?;
        debug!(group = %group.display_name, %group_id, depth, "expanding group");

        let members = self.directory.list_member_users(group_id).await?;
        for user in members {
            if !user.account_enabled && !self.options.include_disabled {
                // Output filter only: users carry no members, so there
                // is nothing to traverse past them anyway.
                debug!(user_id = %user.id, "skipping disabled user");
                continue;
            }
            state.record_user(user, &group, depth);
        }

        let nested = self.directory.list_member_groups(group_id).await?;
        Ok(nested.into_iter().map(|g| g.id).collect())
    }
}
