//! Mutable traversal state scoped to a single resolution run.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::{DirectoryGroup, DirectoryUser, GroupId, UserRecord};

/// State shared across the recursive calls of one run.
///
/// Created fresh by the orchestrator for each invocation; nothing here
/// survives the run or is shared between concurrent runs. Mutation is
/// safe without synchronization because traversal is strictly
/// sequential.
#[derive(Debug, Default)]
pub struct TraversalState {
    visited: HashSet<GroupId>,
    visit_order: Vec<GroupId>,
    users: HashMap<String, UserRecord>,
    errors: Vec<String>,
    groups_processed: u64,
}

impl TraversalState {
    /// Creates empty state for a fresh run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the group was already entered during this run.
    #[must_use]
    pub fn is_visited(&self, group_id: &GroupId) -> bool {
        self.visited.contains(group_id)
    }

    /// Marks a group visited. Must happen before its members are
    /// fetched: a group reached again through any path, including a
    /// cycle back to itself, then short-circuits at the cycle guard
    /// instead of being re-processed.
    pub fn mark_visited(&mut self, group_id: GroupId) {
        if self.visited.insert(group_id) {
            self.visit_order.push(group_id);
            self.groups_processed += 1;
        }
    }

    /// Records a discovered user with first-discovery provenance.
    ///
    /// A user already present keeps the record from the path that found
    /// it first; the later sighting is only logged.
    pub fn record_user(&mut self, user: DirectoryUser, source: &DirectoryGroup, depth: u32) {
        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => {
                debug!(user_id = %user.id, group = %source.display_name, "user already discovered, keeping first provenance");
            }
            Entry::Vacant(slot) => {
                slot.insert(UserRecord {
                    user,
                    source_group_id: source.id,
                    source_group_name: source.display_name.clone(),
                    discovery_depth: depth,
                });
            }
        }
    }

    /// Appends a per-group failure description.
    pub fn record_error(&mut self, message: String) {
        self.errors.push(message);
    }

    /// Groups visited so far, in visit order.
    #[must_use]
    pub fn visited_groups(&self) -> &[GroupId] {
        &self.visit_order
    }

    /// Number of groups whose processing was entered.
    #[must_use]
    pub fn groups_processed(&self) -> u64 {
        self.groups_processed
    }

    /// Number of unique users discovered so far.
    #[must_use]
    pub fn users_found(&self) -> u64 {
        self.users.len() as u64
    }

    /// Consumes the state into its report components: user records,
    /// visit-ordered group IDs, and the error log.
    #[must_use]
    pub fn into_parts(self) -> (Vec<UserRecord>, Vec<GroupId>, Vec<String>) {
        (
            self.users.into_values().collect(),
            self.visit_order,
            self.errors,
        )
    }
}
